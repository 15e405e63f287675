//! Project and research participation records.

use super::user::UserId;
use super::RecordId;
use serde::{Deserialize, Serialize};

pub type ProjectId = RecordId;

/// Top-level research project owning sections and countings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    /// Globally unique, non-blank, at most 255 chars.
    pub name: String,
    /// Public projects are viewable by guests and non-participants.
    pub public: bool,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

/// Membership of one user in one project.
///
/// This is the only authorization fact: `manager = true` grants write access,
/// any participation grants read access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchParticipation {
    pub id: RecordId,
    pub user_id: UserId,
    pub project_id: ProjectId,
    pub manager: bool,
}

impl ResearchParticipation {
    /// Role label used by reports.
    pub fn role(&self) -> &'static str {
        if self.manager {
            "manager"
        } else {
            "observer"
        }
    }
}
