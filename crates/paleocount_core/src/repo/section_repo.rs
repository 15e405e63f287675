//! Section and sample persistence.
//!
//! # Invariants
//! - Samples are listed by `rank DESC` (top of the section first).
//! - Deleting a section removes its samples through `ON DELETE CASCADE`.

use super::{RepoError, RepoResult, SqliteStore};
use crate::model::project::ProjectId;
use crate::model::section::{Sample, SampleId, Section, SectionId};
use rusqlite::{params, OptionalExtension, Row};

const SECTION_SELECT_SQL: &str = "SELECT id, project_id, name, created_at FROM sections";
const SAMPLE_SELECT_SQL: &str =
    "SELECT id, section_id, name, rank, weight, description FROM samples";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSection {
    pub project_id: ProjectId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSample {
    pub section_id: SectionId,
    pub name: String,
    pub rank: i64,
    pub weight: Option<f64>,
    pub description: Option<String>,
}

/// Partial update. Nullable columns use `Option<Option<_>>`: the outer
/// `None` leaves the column untouched, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SamplePatch {
    pub name: Option<String>,
    pub rank: Option<i64>,
    pub weight: Option<Option<f64>>,
    pub description: Option<Option<String>>,
}

pub trait SectionRepository {
    fn find_section(&self, id: SectionId) -> RepoResult<Option<Section>>;
    fn list_sections(&self, project_id: ProjectId) -> RepoResult<Vec<Section>>;
    fn create_section(&self, section: &NewSection) -> RepoResult<Section>;
    fn rename_section(&self, id: SectionId, name: &str) -> RepoResult<Section>;
    fn delete_section(&self, id: SectionId) -> RepoResult<()>;

    fn find_sample(&self, id: SampleId) -> RepoResult<Option<Sample>>;
    fn list_samples(&self, section_id: SectionId) -> RepoResult<Vec<Sample>>;
    fn create_sample(&self, sample: &NewSample) -> RepoResult<Sample>;
    fn update_sample(&self, id: SampleId, patch: &SamplePatch) -> RepoResult<Sample>;
    fn delete_sample(&self, id: SampleId) -> RepoResult<()>;
}

impl SectionRepository for SqliteStore<'_> {
    fn find_section(&self, id: SectionId) -> RepoResult<Option<Section>> {
        let section = self
            .conn()
            .query_row(
                &format!("{SECTION_SELECT_SQL} WHERE id = ?1;"),
                [id],
                |row| Ok(parse_section_row(row)),
            )
            .optional()?;
        section.transpose()
    }

    fn list_sections(&self, project_id: ProjectId) -> RepoResult<Vec<Section>> {
        let mut stmt = self.conn().prepare(&format!(
            "{SECTION_SELECT_SQL} WHERE project_id = ?1 ORDER BY name ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([project_id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_section_row(row)?);
        }
        Ok(items)
    }

    fn create_section(&self, section: &NewSection) -> RepoResult<Section> {
        self.conn().execute(
            "INSERT INTO sections (project_id, name) VALUES (?1, ?2);",
            params![section.project_id, section.name.as_str()],
        )?;
        let id = self.conn().last_insert_rowid();
        self.find_section(id)?
            .ok_or(RepoError::NotFound { entity: "section", id })
    }

    fn rename_section(&self, id: SectionId, name: &str) -> RepoResult<Section> {
        let changed = self.conn().execute(
            "UPDATE sections SET name = ?2 WHERE id = ?1;",
            params![id, name],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "section", id });
        }
        self.find_section(id)?
            .ok_or(RepoError::NotFound { entity: "section", id })
    }

    fn delete_section(&self, id: SectionId) -> RepoResult<()> {
        let changed = self
            .conn()
            .execute("DELETE FROM sections WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "section", id });
        }
        Ok(())
    }

    fn find_sample(&self, id: SampleId) -> RepoResult<Option<Sample>> {
        let sample = self
            .conn()
            .query_row(
                &format!("{SAMPLE_SELECT_SQL} WHERE id = ?1;"),
                [id],
                |row| Ok(parse_sample_row(row)),
            )
            .optional()?;
        sample.transpose()
    }

    fn list_samples(&self, section_id: SectionId) -> RepoResult<Vec<Sample>> {
        let mut stmt = self.conn().prepare(&format!(
            "{SAMPLE_SELECT_SQL} WHERE section_id = ?1 ORDER BY rank DESC, id ASC;"
        ))?;
        let mut rows = stmt.query([section_id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_sample_row(row)?);
        }
        Ok(items)
    }

    fn create_sample(&self, sample: &NewSample) -> RepoResult<Sample> {
        self.conn().execute(
            "INSERT INTO samples (section_id, name, rank, weight, description)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                sample.section_id,
                sample.name.as_str(),
                sample.rank,
                sample.weight,
                sample.description.as_deref(),
            ],
        )?;
        let id = self.conn().last_insert_rowid();
        self.find_sample(id)?
            .ok_or(RepoError::NotFound { entity: "sample", id })
    }

    fn update_sample(&self, id: SampleId, patch: &SamplePatch) -> RepoResult<Sample> {
        let Some(current) = self.find_sample(id)? else {
            return Err(RepoError::NotFound { entity: "sample", id });
        };
        let weight = patch.weight.unwrap_or(current.weight);
        let description = patch
            .description
            .clone()
            .unwrap_or(current.description);

        let changed = self.conn().execute(
            "UPDATE samples
             SET name = ?2, rank = ?3, weight = ?4, description = ?5
             WHERE id = ?1;",
            params![
                id,
                patch.name.as_deref().unwrap_or(current.name.as_str()),
                patch.rank.unwrap_or(current.rank),
                weight,
                description.as_deref(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "sample", id });
        }
        self.find_sample(id)?
            .ok_or(RepoError::NotFound { entity: "sample", id })
    }

    fn delete_sample(&self, id: SampleId) -> RepoResult<()> {
        let changed = self
            .conn()
            .execute("DELETE FROM samples WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "sample", id });
        }
        Ok(())
    }
}

fn parse_section_row(row: &Row<'_>) -> RepoResult<Section> {
    Ok(Section {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_sample_row(row: &Row<'_>) -> RepoResult<Sample> {
    Ok(Sample {
        id: row.get("id")?,
        section_id: row.get("section_id")?,
        name: row.get("name")?,
        rank: row.get("rank")?,
        weight: row.get("weight")?,
        description: row.get("description")?,
    })
}
