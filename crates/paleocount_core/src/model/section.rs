//! Stratigraphic sections and their ranked samples.

use super::project::ProjectId;
use super::RecordId;
use serde::{Deserialize, Serialize};

pub type SectionId = RecordId;
pub type SampleId = RecordId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub project_id: ProjectId,
    /// Unique within the owning project.
    pub name: String,
    pub created_at: i64,
}

/// One sample taken from a section.
///
/// `rank` defines stratigraphic order inside the section and is unique there,
/// as is `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub id: SampleId,
    pub section_id: SectionId,
    pub name: String,
    pub rank: i64,
    /// Dry weight in grams.
    pub weight: Option<f64>,
    pub description: Option<String>,
}
