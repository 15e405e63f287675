//! Success/failure result type threaded through every operation.
//!
//! # Responsibility
//! - Carry either a success value or one expected failure.
//! - Provide railway-style combinators for chaining pipeline steps.
//!
//! # Invariants
//! - A chain stops at the first `Failure`; no partial success exists.
//! - Expected failures (validation, not-found, authorization) are values;
//!   storage outages travel on the separate `RepoError` channel.

use crate::repo::RepoError;
use crate::validate::{ErrorCode, FieldErrors};
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Return type of every operation: fatal storage errors on the outer
/// `Result`, expected outcomes inside.
pub type OperationResult<T> = Result<Outcome<T>, RepoError>;

/// Expected failure detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "error", content = "fields", rename_all = "snake_case")]
pub enum Failure {
    /// Field-keyed violation codes.
    Invalid(FieldErrors),
    NotFound,
    /// No identity is present.
    Unauthorized,
    /// Identity is present but lacks the required role.
    Forbidden,
}

impl Failure {
    /// Single-field validation failure.
    pub fn field(field: impl Into<String>, code: ErrorCode) -> Self {
        let mut errors = FieldErrors::default();
        errors.insert(field, code);
        Self::Invalid(errors)
    }

    /// Stable symbolic reason.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Invalid(_) => "invalid",
            Self::NotFound => "not_found",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
        }
    }

    /// HTTP-equivalent status callers map this failure to.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Invalid(_) => 422,
            Self::NotFound => 404,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
        }
    }

    /// Field errors, when this is a validation failure.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Invalid(errors) => Some(errors),
            _ => None,
        }
    }
}

impl Display for Failure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(errors) => write!(f, "invalid parameters: {errors}"),
            other => f.write_str(other.code()),
        }
    }
}

impl std::error::Error for Failure {}

#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum Outcome<T> {
    Success(T),
    Failure(Failure),
}

impl<T> Outcome<T> {
    /// Applies `f` to a success value; a failure propagates unchanged.
    pub fn and_then<U, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(T) -> Outcome<U>,
    {
        match self {
            Self::Success(value) => f(value),
            Self::Failure(failure) => Outcome::Failure(failure),
        }
    }

    /// Transforms the success value only.
    pub fn map<U, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Success(value) => Outcome::Success(f(value)),
            Self::Failure(failure) => Outcome::Failure(failure),
        }
    }

    /// Observes the success value without altering the chain.
    ///
    /// The hook only sees `&T`, so it cannot turn a failure into a success
    /// or vice versa.
    pub fn on_success<F>(self, f: F) -> Self
    where
        F: FnOnce(&T),
    {
        if let Self::Success(value) = &self {
            f(value);
        }
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure),
        }
    }

    pub fn success(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure(_) => None,
        }
    }

    /// Converts into a std `Result` so `?` can short-circuit inside a step.
    pub fn into_result(self) -> Result<T, Failure> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failure(failure) => Err(failure),
        }
    }
}

impl<T> From<Result<T, Failure>> for Outcome<T> {
    fn from(value: Result<T, Failure>) -> Self {
        match value {
            Ok(value) => Self::Success(value),
            Err(failure) => Self::Failure(failure),
        }
    }
}
