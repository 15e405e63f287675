//! Domain records for paleontological counting data.
//!
//! # Responsibility
//! - Define the plain data shapes returned by repositories and services.
//! - Keep serialized field names stable for API callers.
//!
//! # Invariants
//! - Ownership is tree-shaped: Project → Section → Sample → Occurrence and
//!   Group → Species → Occurrence.
//! - Records are only created through services; these types carry no
//!   persistence behavior.

pub mod counting;
pub mod project;
pub mod section;
pub mod taxonomy;
pub mod user;

/// SQLite row id shared by every persisted record.
pub type RecordId = i64;
