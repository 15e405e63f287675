//! Field validation for raw operation parameters.
//!
//! # Responsibility
//! - Normalize flat string maps into typed parameter maps.
//! - Report one violation code per invalid field.
//! - Define the uniqueness collaborator queried after type checks pass.
//!
//! # Invariants
//! - Rules for one field run left-to-right and stop at the first failure.
//! - Fields are evaluated independently; unknown keys are ignored.

mod errors;
pub mod params;
pub mod rules;
pub mod schema;
pub mod uniqueness;

pub use errors::{ErrorCode, FieldErrors};
pub use params::{CleanParams, RawParams, Value};
pub use rules::{FieldSpec, Kind, Presence, Rule};
pub use schema::{Schema, Verb};
pub use uniqueness::{NameScope, RankScope, UniquenessChecker};
