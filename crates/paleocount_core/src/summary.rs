//! Counting summary: pure aggregation over occurrence records.
//!
//! # Responsibility
//! - Map each occurrence status to a display symbol and a count category.
//! - Sum quantities per category for reports.
//!
//! # Invariants
//! - The status → category/symbol table is closed and not configurable.
//! - Absent quantities contribute zero.
//! - Sums saturate at `i64::MAX` instead of wrapping.
//! - No side effects; safe to recompute on every read.

use crate::model::counting::{CountingId, Occurrence, OccurrenceId, OccurrenceStatus};
use crate::model::section::SampleId;
use crate::model::taxonomy::SpeciesId;
use serde::Serialize;

/// Marker appended to a symbol when an identification is uncertain.
pub const UNCERTAIN_MARKER: &str = "?";

/// Whether a status takes part in the count proper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    Countable,
    Uncountable,
}

pub fn category(status: OccurrenceStatus) -> StatusCategory {
    match status {
        OccurrenceStatus::Normal => StatusCategory::Countable,
        OccurrenceStatus::Present | OccurrenceStatus::Reworked | OccurrenceStatus::Absent => {
            StatusCategory::Uncountable
        }
    }
}

/// Base display symbol for a status.
pub fn status_symbol(status: OccurrenceStatus) -> &'static str {
    match status {
        OccurrenceStatus::Normal => "",
        OccurrenceStatus::Present => "+",
        OccurrenceStatus::Reworked => "R",
        OccurrenceStatus::Absent => "-",
    }
}

/// Display symbol for one occurrence, including the uncertainty marker.
pub fn display_symbol(status: OccurrenceStatus, uncertain: bool) -> String {
    let mut symbol = status_symbol(status).to_string();
    if uncertain {
        symbol.push_str(UNCERTAIN_MARKER);
    }
    symbol
}

/// Status-partitioned quantity sums.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CountingSummary {
    pub countable: i64,
    pub uncountable: i64,
    pub total: i64,
}

impl CountingSummary {
    pub fn countable_sum(&self) -> i64 {
        self.countable
    }

    pub fn uncountable_sum(&self) -> i64 {
        self.uncountable
    }

    pub fn total_sum(&self) -> i64 {
        self.total
    }
}

/// Sums quantities per category.
pub fn summarize<'a, I>(occurrences: I) -> CountingSummary
where
    I: IntoIterator<Item = &'a Occurrence>,
{
    let mut summary = CountingSummary::default();
    for occurrence in occurrences {
        let quantity = occurrence.quantity.unwrap_or(0);
        match category(occurrence.status) {
            StatusCategory::Countable => {
                summary.countable = summary.countable.saturating_add(quantity)
            }
            StatusCategory::Uncountable => {
                summary.uncountable = summary.uncountable.saturating_add(quantity)
            }
        }
    }
    summary.total = summary.countable.saturating_add(summary.uncountable);
    summary
}

/// Occurrence as rendered to API callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OccurrenceView {
    pub id: OccurrenceId,
    pub species_id: SpeciesId,
    pub rank: i64,
    pub quantity: Option<i64>,
    pub status: OccurrenceStatus,
    pub status_symbol: String,
    pub uncertain: bool,
}

impl From<&Occurrence> for OccurrenceView {
    fn from(occurrence: &Occurrence) -> Self {
        Self {
            id: occurrence.id,
            species_id: occurrence.species_id,
            rank: occurrence.rank,
            quantity: occurrence.quantity,
            status: occurrence.status,
            status_symbol: display_symbol(occurrence.status, occurrence.uncertain),
            uncertain: occurrence.uncertain,
        }
    }
}

/// One occurrence with the refreshed summary of its sample, returned after
/// a tally change so callers can redraw the cell and the totals together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TallyEntry {
    pub counting_id: CountingId,
    pub sample_id: SampleId,
    #[serde(flatten)]
    pub occurrence: OccurrenceView,
    pub summary: CountingSummary,
}

impl TallyEntry {
    /// `sheet` holds the current occurrences of the same (counting, sample).
    pub fn build(occurrence: &Occurrence, sheet: &[Occurrence]) -> Self {
        Self {
            counting_id: occurrence.counting_id,
            sample_id: occurrence.sample_id,
            occurrence: OccurrenceView::from(occurrence),
            summary: summarize(sheet),
        }
    }
}

/// Tally sheet of one sample within one counting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleReport {
    pub counting_id: CountingId,
    pub sample_id: SampleId,
    /// Caller-supplied order is kept (rank descending from storage).
    pub occurrences: Vec<OccurrenceView>,
    pub summary: CountingSummary,
}

impl SampleReport {
    pub fn build(counting_id: CountingId, sample_id: SampleId, occurrences: &[Occurrence]) -> Self {
        Self {
            counting_id,
            sample_id,
            occurrences: occurrences.iter().map(OccurrenceView::from).collect(),
            summary: summarize(occurrences),
        }
    }
}
