//! Operations: one service per aggregate, one method per verb.
//!
//! # Responsibility
//! - Run every request through authenticate → validate → authorize →
//!   uniqueness → mutate, strictly in that order.
//! - Translate storage conflicts and missing rows into typed failures.
//!
//! # Invariants
//! - Writes reject guests before looking at parameters, so a guest learns
//!   nothing about validation state.
//! - Uniqueness queries run only after the project-level check passed.
//! - Storage outages are returned on the fatal channel, never as a
//!   `Failure`.

pub mod counting_service;
pub mod occurrence_service;
pub mod project_service;
pub mod section_service;
pub mod taxonomy_service;
pub mod user_service;

use crate::auth::Authorizer;
use crate::model::project::Project;
use crate::model::user::UserId;
use crate::outcome::{Failure, OperationResult, Outcome};
use crate::repo::RepoError;
use crate::validate::{CleanParams, RawParams, Schema};
use log::{debug, error, info};

/// Early exit from an operation step.
#[derive(Debug)]
pub(crate) enum Halt {
    Failure(Failure),
    Fatal(RepoError),
}

impl From<Failure> for Halt {
    fn from(value: Failure) -> Self {
        Self::Failure(value)
    }
}

impl From<RepoError> for Halt {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { .. } => Self::Failure(Failure::NotFound),
            RepoError::Conflict { field, code } => Self::Failure(Failure::field(field, code)),
            other => Self::Fatal(other),
        }
    }
}

pub(crate) type Step<T> = Result<T, Halt>;

/// Converts a finished step into the public result shape and logs it.
pub(crate) fn conclude<T>(event: &'static str, step: Step<T>) -> OperationResult<T> {
    match step {
        Ok(value) => {
            info!("event={event} module=service status=ok");
            Ok(Outcome::Success(value))
        }
        Err(Halt::Failure(failure)) => {
            match &failure {
                Failure::Invalid(errors) => debug!(
                    "event={event} module=service status=rejected reason=invalid fields={}",
                    errors.field_names()
                ),
                other => debug!(
                    "event={event} module=service status=rejected reason={}",
                    other.code()
                ),
            }
            Ok(Outcome::Failure(failure))
        }
        Err(Halt::Fatal(err)) => {
            error!("event={event} module=service status=error error={err}");
            Err(err)
        }
    }
}

/// Writes need an identity before anything else is inspected.
pub(crate) fn require_identity(auth: &dyn Authorizer) -> Result<UserId, Failure> {
    auth.actor().ok_or(Failure::Unauthorized)
}

pub(crate) fn validate(schema: Schema, raw: &RawParams) -> Result<CleanParams, Failure> {
    schema.validate(raw).into_result()
}

pub(crate) fn ensure_view(auth: &dyn Authorizer, project: &Project) -> Step<()> {
    if auth.can_view(project)? {
        Ok(())
    } else {
        Err(auth.denial().into())
    }
}

pub(crate) fn ensure_manage(auth: &dyn Authorizer, project: &Project) -> Step<()> {
    if auth.can_manage(project)? {
        Ok(())
    } else {
        Err(auth.denial().into())
    }
}

/// Unwraps a lookup result, mapping a missing row to `NotFound`.
pub(crate) fn found<T>(value: Option<T>) -> Step<T> {
    value.ok_or(Halt::Failure(Failure::NotFound))
}
