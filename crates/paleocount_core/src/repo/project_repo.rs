//! Project and participation persistence.
//!
//! # Invariants
//! - A project is created together with its first manager participation in
//!   one transaction, so no project exists without a manager.
//! - Participation is unique per (project, user).

use super::{bool_to_int, int_to_bool, RepoError, RepoResult, SqliteStore};
use crate::model::project::{Project, ProjectId, ResearchParticipation};
use crate::model::user::UserId;
use crate::model::RecordId;
use rusqlite::{params, OptionalExtension, Row, Transaction, TransactionBehavior};

const PROJECT_SELECT_SQL: &str = "SELECT id, name, public, created_at FROM projects";
const PARTICIPATION_SELECT_SQL: &str =
    "SELECT id, user_id, project_id, manager FROM research_participations";

/// Insert model for a new project and its founding manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub name: String,
    pub public: bool,
    pub manager_id: UserId,
}

/// Partial update; `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub public: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewParticipation {
    pub project_id: ProjectId,
    pub user_id: UserId,
    pub manager: bool,
}

pub trait ProjectRepository {
    fn find_project(&self, id: ProjectId) -> RepoResult<Option<Project>>;
    /// Public projects plus those `user_id` participates in, by name.
    fn list_visible_projects(&self, user_id: Option<UserId>) -> RepoResult<Vec<Project>>;
    fn create_project(&self, project: &NewProject) -> RepoResult<Project>;
    fn update_project(&self, id: ProjectId, patch: &ProjectPatch) -> RepoResult<Project>;
    /// Deletes the project and, through cascades, everything it owns.
    fn delete_project(&self, id: ProjectId) -> RepoResult<()>;
}

/// Read-only participation lookup used by authorizers.
pub trait ParticipationLookup {
    fn participation(
        &self,
        project_id: ProjectId,
        user_id: UserId,
    ) -> RepoResult<Option<ResearchParticipation>>;
}

pub trait ParticipationRepository: ParticipationLookup {
    fn find_participation(&self, id: RecordId) -> RepoResult<Option<ResearchParticipation>>;
    fn list_participations(&self, project_id: ProjectId) -> RepoResult<Vec<ResearchParticipation>>;
    fn create_participation(
        &self,
        participation: &NewParticipation,
    ) -> RepoResult<ResearchParticipation>;
    fn set_manager(&self, id: RecordId, manager: bool) -> RepoResult<ResearchParticipation>;
    fn delete_participation(&self, id: RecordId) -> RepoResult<()>;
}

impl ProjectRepository for SqliteStore<'_> {
    fn find_project(&self, id: ProjectId) -> RepoResult<Option<Project>> {
        let project = self
            .conn()
            .query_row(
                &format!("{PROJECT_SELECT_SQL} WHERE id = ?1;"),
                [id],
                |row| Ok(parse_project_row(row)),
            )
            .optional()?;
        project.transpose()
    }

    fn list_visible_projects(&self, user_id: Option<UserId>) -> RepoResult<Vec<Project>> {
        let mut stmt = self.conn().prepare(&format!(
            "{PROJECT_SELECT_SQL}
             WHERE public = 1
                OR id IN (
                    SELECT project_id FROM research_participations WHERE user_id = ?1
                )
             ORDER BY name ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([user_id])?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            projects.push(parse_project_row(row)?);
        }
        Ok(projects)
    }

    fn create_project(&self, project: &NewProject) -> RepoResult<Project> {
        let tx = Transaction::new_unchecked(self.conn(), TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO projects (name, public) VALUES (?1, ?2);",
            params![project.name.as_str(), bool_to_int(project.public)],
        )?;
        let project_id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO research_participations (user_id, project_id, manager)
             VALUES (?1, ?2, 1);",
            params![project.manager_id, project_id],
        )?;
        tx.commit()?;

        self.find_project(project_id)?.ok_or(RepoError::NotFound {
            entity: "project",
            id: project_id,
        })
    }

    fn update_project(&self, id: ProjectId, patch: &ProjectPatch) -> RepoResult<Project> {
        let changed = self.conn().execute(
            "UPDATE projects
             SET name = COALESCE(?2, name),
                 public = COALESCE(?3, public)
             WHERE id = ?1;",
            params![id, patch.name.as_deref(), patch.public.map(bool_to_int)],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "project",
                id,
            });
        }
        self.find_project(id)?.ok_or(RepoError::NotFound {
            entity: "project",
            id,
        })
    }

    fn delete_project(&self, id: ProjectId) -> RepoResult<()> {
        let changed = self
            .conn()
            .execute("DELETE FROM projects WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "project",
                id,
            });
        }
        Ok(())
    }
}

impl ParticipationLookup for SqliteStore<'_> {
    fn participation(
        &self,
        project_id: ProjectId,
        user_id: UserId,
    ) -> RepoResult<Option<ResearchParticipation>> {
        let participation = self
            .conn()
            .query_row(
                &format!("{PARTICIPATION_SELECT_SQL} WHERE project_id = ?1 AND user_id = ?2;"),
                params![project_id, user_id],
                |row| Ok(parse_participation_row(row)),
            )
            .optional()?;
        participation.transpose()
    }
}

impl ParticipationRepository for SqliteStore<'_> {
    fn find_participation(&self, id: RecordId) -> RepoResult<Option<ResearchParticipation>> {
        let participation = self
            .conn()
            .query_row(
                &format!("{PARTICIPATION_SELECT_SQL} WHERE id = ?1;"),
                [id],
                |row| Ok(parse_participation_row(row)),
            )
            .optional()?;
        participation.transpose()
    }

    fn list_participations(&self, project_id: ProjectId) -> RepoResult<Vec<ResearchParticipation>> {
        let mut stmt = self.conn().prepare(&format!(
            "{PARTICIPATION_SELECT_SQL} WHERE project_id = ?1 ORDER BY manager DESC, id ASC;"
        ))?;
        let mut rows = stmt.query([project_id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_participation_row(row)?);
        }
        Ok(items)
    }

    fn create_participation(
        &self,
        participation: &NewParticipation,
    ) -> RepoResult<ResearchParticipation> {
        self.conn().execute(
            "INSERT INTO research_participations (user_id, project_id, manager)
             VALUES (?1, ?2, ?3);",
            params![
                participation.user_id,
                participation.project_id,
                bool_to_int(participation.manager)
            ],
        )?;
        let id = self.conn().last_insert_rowid();
        self.find_participation(id)?.ok_or(RepoError::NotFound {
            entity: "participation",
            id,
        })
    }

    fn set_manager(&self, id: RecordId, manager: bool) -> RepoResult<ResearchParticipation> {
        let changed = self.conn().execute(
            "UPDATE research_participations SET manager = ?2 WHERE id = ?1;",
            params![id, bool_to_int(manager)],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "participation",
                id,
            });
        }
        self.find_participation(id)?.ok_or(RepoError::NotFound {
            entity: "participation",
            id,
        })
    }

    fn delete_participation(&self, id: RecordId) -> RepoResult<()> {
        let changed = self
            .conn()
            .execute("DELETE FROM research_participations WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "participation",
                id,
            });
        }
        Ok(())
    }
}

fn parse_project_row(row: &Row<'_>) -> RepoResult<Project> {
    Ok(Project {
        id: row.get("id")?,
        name: row.get("name")?,
        public: int_to_bool(row.get("public")?, "projects.public")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_participation_row(row: &Row<'_>) -> RepoResult<ResearchParticipation> {
    Ok(ResearchParticipation {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        project_id: row.get("project_id")?,
        manager: int_to_bool(row.get("manager")?, "research_participations.manager")?,
    })
}
