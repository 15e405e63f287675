//! SQLite answers to the validators' uniqueness predicates.

use super::{RepoResult, SqliteStore};
use crate::model::counting::CountingId;
use crate::model::section::SampleId;
use crate::model::taxonomy::SpeciesId;
use crate::model::user::UserId;
use crate::model::RecordId;
use crate::validate::{NameScope, RankScope, UniquenessChecker};
use rusqlite::params;

/// Table and optional scope column holding `name` for one scope.
fn name_table(scope: NameScope) -> (&'static str, Option<(&'static str, RecordId)>) {
    match scope {
        NameScope::Projects => ("projects", None),
        NameScope::Sections(project_id) => ("sections", Some(("project_id", project_id))),
        NameScope::Samples(section_id) => ("samples", Some(("section_id", section_id))),
        NameScope::Countings(project_id) => ("countings", Some(("project_id", project_id))),
        NameScope::Groups => ("taxon_groups", None),
        NameScope::Species(group_id) => ("species", Some(("group_id", group_id))),
        NameScope::Fields(group_id) => ("fields", Some(("group_id", group_id))),
        NameScope::Choices(field_id) => ("choices", Some(("field_id", field_id))),
    }
}

impl UniquenessChecker for SqliteStore<'_> {
    fn name_exists_within_scope(
        &self,
        scope: NameScope,
        name: &str,
        except: Option<RecordId>,
    ) -> RepoResult<bool> {
        let (table, scope_column) = name_table(scope);
        let exists: i64 = match scope_column {
            Some((column, parent_id)) => self.conn().query_row(
                &format!(
                    "SELECT EXISTS(
                        SELECT 1 FROM {table}
                        WHERE {column} = ?1 AND name = ?2 AND (?3 IS NULL OR id <> ?3)
                    );"
                ),
                params![parent_id, name, except],
                |row| row.get(0),
            )?,
            None => self.conn().query_row(
                &format!(
                    "SELECT EXISTS(
                        SELECT 1 FROM {table}
                        WHERE name = ?1 AND (?2 IS NULL OR id <> ?2)
                    );"
                ),
                params![name, except],
                |row| row.get(0),
            )?,
        };
        Ok(exists == 1)
    }

    fn rank_exists(
        &self,
        scope: RankScope,
        rank: i64,
        except: Option<RecordId>,
    ) -> RepoResult<bool> {
        let exists: i64 = match scope {
            RankScope::Samples(section_id) => self.conn().query_row(
                "SELECT EXISTS(
                    SELECT 1 FROM samples
                    WHERE section_id = ?1 AND rank = ?2 AND (?3 IS NULL OR id <> ?3)
                );",
                params![section_id, rank, except],
                |row| row.get(0),
            )?,
            RankScope::Occurrences {
                counting_id,
                sample_id,
            } => self.conn().query_row(
                "SELECT EXISTS(
                    SELECT 1 FROM occurrences
                    WHERE counting_id = ?1 AND sample_id = ?2 AND rank = ?3
                      AND (?4 IS NULL OR id <> ?4)
                );",
                params![counting_id, sample_id, rank, except],
                |row| row.get(0),
            )?,
        };
        Ok(exists == 1)
    }

    fn species_exists_within_scope(
        &self,
        counting_id: CountingId,
        sample_id: SampleId,
        species_id: SpeciesId,
        except: Option<RecordId>,
    ) -> RepoResult<bool> {
        let exists: i64 = self.conn().query_row(
            "SELECT EXISTS(
                SELECT 1 FROM occurrences
                WHERE counting_id = ?1 AND sample_id = ?2 AND species_id = ?3
                  AND (?4 IS NULL OR id <> ?4)
            );",
            params![counting_id, sample_id, species_id, except],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn email_exists(&self, email: &str, except: Option<UserId>) -> RepoResult<bool> {
        let exists: i64 = self.conn().query_row(
            "SELECT EXISTS(
                SELECT 1 FROM users WHERE email = ?1 AND (?2 IS NULL OR id <> ?2)
            );",
            params![email, except],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}
