//! Counting and occurrence persistence.
//!
//! # Invariants
//! - Occurrences of one (counting, sample) are listed by `rank DESC`.
//! - `status` is stored as its stable string; unknown strings are rejected
//!   on read instead of being masked.

use super::{bool_to_int, int_to_bool, RepoError, RepoResult, SqliteStore};
use crate::model::counting::{Counting, CountingId, Occurrence, OccurrenceId, OccurrenceStatus};
use crate::model::project::ProjectId;
use crate::model::section::SampleId;
use crate::model::taxonomy::{GroupId, SpeciesId};
use crate::validate::ErrorCode;
use rusqlite::{params, OptionalExtension, Row};

const COUNTING_SELECT_SQL: &str =
    "SELECT id, project_id, group_id, marker_id, name, created_at FROM countings";
const OCCURRENCE_SELECT_SQL: &str = "SELECT
    id,
    counting_id,
    sample_id,
    species_id,
    rank,
    quantity,
    status,
    uncertain
FROM occurrences";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCounting {
    pub project_id: ProjectId,
    pub group_id: GroupId,
    pub marker_id: Option<SpeciesId>,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountingPatch {
    pub name: Option<String>,
    pub marker_id: Option<Option<SpeciesId>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOccurrence {
    pub counting_id: CountingId,
    pub sample_id: SampleId,
    pub species_id: SpeciesId,
    pub rank: i64,
    pub quantity: Option<i64>,
    pub status: OccurrenceStatus,
    pub uncertain: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OccurrencePatch {
    pub rank: Option<i64>,
    pub quantity: Option<Option<i64>>,
    pub status: Option<OccurrenceStatus>,
    pub uncertain: Option<bool>,
}

pub trait CountingRepository {
    fn find_counting(&self, id: CountingId) -> RepoResult<Option<Counting>>;
    fn list_countings(&self, project_id: ProjectId) -> RepoResult<Vec<Counting>>;
    fn create_counting(&self, counting: &NewCounting) -> RepoResult<Counting>;
    fn update_counting(&self, id: CountingId, patch: &CountingPatch) -> RepoResult<Counting>;
    fn delete_counting(&self, id: CountingId) -> RepoResult<()>;

    fn find_occurrence(&self, id: OccurrenceId) -> RepoResult<Option<Occurrence>>;
    fn list_occurrences(
        &self,
        counting_id: CountingId,
        sample_id: SampleId,
    ) -> RepoResult<Vec<Occurrence>>;
    /// One past the highest rank used in (counting, sample), or 0.
    fn next_occurrence_rank(&self, counting_id: CountingId, sample_id: SampleId)
        -> RepoResult<i64>;
    fn create_occurrence(&self, occurrence: &NewOccurrence) -> RepoResult<Occurrence>;
    fn update_occurrence(
        &self,
        id: OccurrenceId,
        patch: &OccurrencePatch,
    ) -> RepoResult<Occurrence>;
    fn delete_occurrence(&self, id: OccurrenceId) -> RepoResult<()>;
}

impl CountingRepository for SqliteStore<'_> {
    fn find_counting(&self, id: CountingId) -> RepoResult<Option<Counting>> {
        let counting = self
            .conn()
            .query_row(
                &format!("{COUNTING_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_counting_row,
            )
            .optional()?;
        Ok(counting)
    }

    fn list_countings(&self, project_id: ProjectId) -> RepoResult<Vec<Counting>> {
        let mut stmt = self.conn().prepare(&format!(
            "{COUNTING_SELECT_SQL} WHERE project_id = ?1 ORDER BY name ASC, id ASC;"
        ))?;
        let items = stmt
            .query_map([project_id], parse_counting_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    fn create_counting(&self, counting: &NewCounting) -> RepoResult<Counting> {
        self.conn().execute(
            "INSERT INTO countings (project_id, group_id, marker_id, name)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                counting.project_id,
                counting.group_id,
                counting.marker_id,
                counting.name.as_str()
            ],
        )?;
        let id = self.conn().last_insert_rowid();
        self.find_counting(id)?
            .ok_or(RepoError::NotFound { entity: "counting", id })
    }

    fn update_counting(&self, id: CountingId, patch: &CountingPatch) -> RepoResult<Counting> {
        let Some(current) = self.find_counting(id)? else {
            return Err(RepoError::NotFound { entity: "counting", id });
        };
        self.conn().execute(
            "UPDATE countings SET name = ?2, marker_id = ?3 WHERE id = ?1;",
            params![
                id,
                patch.name.as_deref().unwrap_or(current.name.as_str()),
                patch.marker_id.unwrap_or(current.marker_id),
            ],
        )?;
        self.find_counting(id)?
            .ok_or(RepoError::NotFound { entity: "counting", id })
    }

    fn delete_counting(&self, id: CountingId) -> RepoResult<()> {
        let changed = self
            .conn()
            .execute("DELETE FROM countings WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "counting", id });
        }
        Ok(())
    }

    fn find_occurrence(&self, id: OccurrenceId) -> RepoResult<Option<Occurrence>> {
        let occurrence = self
            .conn()
            .query_row(
                &format!("{OCCURRENCE_SELECT_SQL} WHERE id = ?1;"),
                [id],
                |row| Ok(parse_occurrence_row(row)),
            )
            .optional()?;
        occurrence.transpose()
    }

    fn list_occurrences(
        &self,
        counting_id: CountingId,
        sample_id: SampleId,
    ) -> RepoResult<Vec<Occurrence>> {
        let mut stmt = self.conn().prepare(&format!(
            "{OCCURRENCE_SELECT_SQL}
             WHERE counting_id = ?1 AND sample_id = ?2
             ORDER BY rank DESC, id ASC;"
        ))?;
        let mut rows = stmt.query(params![counting_id, sample_id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_occurrence_row(row)?);
        }
        Ok(items)
    }

    fn next_occurrence_rank(
        &self,
        counting_id: CountingId,
        sample_id: SampleId,
    ) -> RepoResult<i64> {
        let highest: Option<i64> = self.conn().query_row(
            "SELECT MAX(rank) FROM occurrences WHERE counting_id = ?1 AND sample_id = ?2;",
            params![counting_id, sample_id],
            |row| row.get(0),
        )?;
        match highest {
            None => Ok(0),
            Some(rank) => rank.checked_add(1).ok_or_else(|| RepoError::Conflict {
                field: "rank".to_string(),
                code: ErrorCode::TooLarge,
            }),
        }
    }

    fn create_occurrence(&self, occurrence: &NewOccurrence) -> RepoResult<Occurrence> {
        self.conn().execute(
            "INSERT INTO occurrences (
                counting_id,
                sample_id,
                species_id,
                rank,
                quantity,
                status,
                uncertain
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                occurrence.counting_id,
                occurrence.sample_id,
                occurrence.species_id,
                occurrence.rank,
                occurrence.quantity,
                occurrence.status.as_str(),
                bool_to_int(occurrence.uncertain),
            ],
        )?;
        let id = self.conn().last_insert_rowid();
        self.find_occurrence(id)?
            .ok_or(RepoError::NotFound { entity: "occurrence", id })
    }

    fn update_occurrence(
        &self,
        id: OccurrenceId,
        patch: &OccurrencePatch,
    ) -> RepoResult<Occurrence> {
        let Some(current) = self.find_occurrence(id)? else {
            return Err(RepoError::NotFound { entity: "occurrence", id });
        };
        self.conn().execute(
            "UPDATE occurrences
             SET rank = ?2, quantity = ?3, status = ?4, uncertain = ?5
             WHERE id = ?1;",
            params![
                id,
                patch.rank.unwrap_or(current.rank),
                patch.quantity.unwrap_or(current.quantity),
                patch.status.unwrap_or(current.status).as_str(),
                bool_to_int(patch.uncertain.unwrap_or(current.uncertain)),
            ],
        )?;
        self.find_occurrence(id)?
            .ok_or(RepoError::NotFound { entity: "occurrence", id })
    }

    fn delete_occurrence(&self, id: OccurrenceId) -> RepoResult<()> {
        let changed = self
            .conn()
            .execute("DELETE FROM occurrences WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "occurrence", id });
        }
        Ok(())
    }
}

fn parse_counting_row(row: &Row<'_>) -> rusqlite::Result<Counting> {
    Ok(Counting {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        group_id: row.get("group_id")?,
        marker_id: row.get("marker_id")?,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_occurrence_row(row: &Row<'_>) -> RepoResult<Occurrence> {
    let status_text: String = row.get("status")?;
    let status = OccurrenceStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid occurrence status `{status_text}` in occurrences.status"
        ))
    })?;

    Ok(Occurrence {
        id: row.get("id")?,
        counting_id: row.get("counting_id")?,
        sample_id: row.get("sample_id")?,
        species_id: row.get("species_id")?,
        rank: row.get("rank")?,
        quantity: row.get("quantity")?,
        status,
        uncertain: int_to_bool(row.get("uncertain")?, "occurrences.uncertain")?,
    })
}
