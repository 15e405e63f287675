//! Taxonomy and the attribute side model used for catalogue filtering.
//!
//! A [`Group`] owns species and defines [`Field`]s; every field has
//! enumerated [`Choice`]s, and a [`Feature`] tags one species with one
//! choice. None of this takes part in counting arithmetic.

use super::RecordId;
use serde::{Deserialize, Serialize};

pub type GroupId = RecordId;
pub type SpeciesId = RecordId;
pub type FieldId = RecordId;
pub type ChoiceId = RecordId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Species {
    pub id: SpeciesId,
    pub group_id: GroupId,
    /// Unique within the group.
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub id: FieldId,
    pub group_id: GroupId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub id: ChoiceId,
    pub field_id: FieldId,
    pub name: String,
}

/// Species tagged with one choice; at most one per (species, field).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub id: RecordId,
    pub species_id: SpeciesId,
    pub field_id: FieldId,
    pub choice_id: ChoiceId,
}
