//! Uniqueness collaborator queried after schema validation.
//!
//! Validators only see these narrow predicates; the storage layer answers
//! them. A racing writer can still win between the check and the insert, in
//! which case storage reports a constraint conflict and services translate
//! it to the same `taken` code.

use crate::model::counting::CountingId;
use crate::model::section::{SampleId, SectionId};
use crate::model::taxonomy::{FieldId, GroupId, SpeciesId};
use crate::model::user::UserId;
use crate::model::{project::ProjectId, RecordId};
use crate::repo::RepoResult;

/// Parent scope inside which a `name` must be unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameScope {
    Projects,
    Sections(ProjectId),
    Samples(SectionId),
    Countings(ProjectId),
    Groups,
    Species(GroupId),
    Fields(GroupId),
    Choices(FieldId),
}

/// Parent scope inside which a `rank` must be unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankScope {
    Samples(SectionId),
    Occurrences {
        counting_id: CountingId,
        sample_id: SampleId,
    },
}

pub trait UniquenessChecker {
    /// Whether another record named `name` exists in `scope`, ignoring the
    /// record `except` (the one being updated).
    fn name_exists_within_scope(
        &self,
        scope: NameScope,
        name: &str,
        except: Option<RecordId>,
    ) -> RepoResult<bool>;

    fn rank_exists(&self, scope: RankScope, rank: i64, except: Option<RecordId>)
        -> RepoResult<bool>;

    /// Whether `species_id` is already tallied in (counting, sample).
    fn species_exists_within_scope(
        &self,
        counting_id: CountingId,
        sample_id: SampleId,
        species_id: SpeciesId,
        except: Option<RecordId>,
    ) -> RepoResult<bool>;

    fn email_exists(&self, email: &str, except: Option<UserId>) -> RepoResult<bool>;
}
