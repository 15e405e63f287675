//! Counting campaigns and per-sample species occurrences.
//!
//! # Invariants
//! - At most one occurrence per (counting, sample, species) and per
//!   (counting, sample, rank).
//! - `quantity` is never negative; absence is `None`, not a sentinel.

use super::project::ProjectId;
use super::section::SampleId;
use super::taxonomy::{GroupId, SpeciesId};
use super::RecordId;
use serde::{Deserialize, Serialize};

pub type CountingId = RecordId;
pub type OccurrenceId = RecordId;

/// Named campaign tallying one taxonomic group across a project's samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counting {
    pub id: CountingId,
    pub project_id: ProjectId,
    pub group_id: GroupId,
    /// Optional marker species; always a member of `group_id`.
    pub marker_id: Option<SpeciesId>,
    pub name: String,
    pub created_at: i64,
}

/// Observation status of one occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OccurrenceStatus {
    /// Counted specimens.
    #[default]
    Normal,
    /// Seen outside the counted fields of view.
    Present,
    /// Specimens reworked from older strata.
    Reworked,
    /// Searched for and explicitly marked absent.
    Absent,
}

impl OccurrenceStatus {
    pub const ALL: [OccurrenceStatus; 4] = [
        OccurrenceStatus::Normal,
        OccurrenceStatus::Present,
        OccurrenceStatus::Reworked,
        OccurrenceStatus::Absent,
    ];

    /// Stable string stored in `occurrences.status`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Present => "present",
            Self::Reworked => "reworked",
            Self::Absent => "absent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "normal" => Some(Self::Normal),
            "present" => Some(Self::Present),
            "reworked" => Some(Self::Reworked),
            "absent" => Some(Self::Absent),
            _ => None,
        }
    }
}

/// One species' observed quantity/status within one sample of one counting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub id: OccurrenceId,
    pub counting_id: CountingId,
    pub sample_id: SampleId,
    pub species_id: SpeciesId,
    /// Position on the (counting, sample) tally sheet.
    pub rank: i64,
    pub quantity: Option<i64>,
    pub status: OccurrenceStatus,
    /// Orthogonal to `status`; rendered as a trailing `?`.
    pub uncertain: bool,
}

/// Applies a relative adjustment to an occurrence quantity.
///
/// A shift that would drive the quantity below zero clears it to `None`
/// instead. A zero shift is a no-op, so absent stays absent.
pub fn shifted_quantity(current: Option<i64>, shift: i64) -> Option<i64> {
    if shift == 0 {
        return current;
    }
    let next = current.unwrap_or(0).saturating_add(shift);
    if next < 0 {
        None
    } else {
        Some(next)
    }
}
