//! Storage collaborator: repository contracts and their SQLite implementation.
//!
//! # Responsibility
//! - Define narrow, single-purpose data access contracts per aggregate.
//! - Keep SQL inside the persistence boundary.
//! - Report constraint conflicts as semantic errors so services can map them.
//!
//! # Invariants
//! - One `SqliteStore` borrows one migrated connection; it holds no other
//!   state and never keeps a transaction open across calls.
//! - Unique-constraint failures surface as `RepoError::Conflict` naming the
//!   offending column.

pub mod counting_repo;
pub mod project_repo;
pub mod section_repo;
pub mod taxonomy_repo;
mod uniqueness_repo;
pub mod user_repo;

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::RecordId;
use crate::validate::ErrorCode;
use rusqlite::{ffi, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Storage-layer error.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target row disappeared between lookup and write.
    NotFound { entity: &'static str, id: RecordId },
    /// Constraint rejected the write; `field` names the offending column.
    Conflict { field: String, code: ErrorCode },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted data cannot be converted to a valid record.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Conflict { field, code } => write!(f, "constraint conflict on `{field}`: {code}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        if let Some(field) = unique_violation_column(&value) {
            return Self::Conflict {
                field,
                code: ErrorCode::Taken,
            };
        }
        if is_foreign_key_violation(&value) {
            return Self::Conflict {
                field: "id".to_string(),
                code: ErrorCode::InUse,
            };
        }
        Self::Db(DbError::Sqlite(value))
    }
}

/// Extracts the last column of a `UNIQUE constraint failed: t.a, t.b`
/// message; for composite keys that is the scoped column.
fn unique_violation_column(err: &rusqlite::Error) -> Option<String> {
    match err {
        rusqlite::Error::SqliteFailure(inner, Some(message))
            if inner.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            let columns = message.strip_prefix("UNIQUE constraint failed: ")?;
            let last = columns.rsplit(", ").next()?;
            last.rsplit('.').next().map(str::to_string)
        }
        _ => None,
    }
}

fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}

/// SQLite-backed implementation of every repository contract.
#[derive(Clone, Copy)]
pub struct SqliteStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStore<'conn> {
    /// Creates a store over a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let expected_version = latest_version();
        let actual_version: u32 =
            conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }

    pub(crate) fn conn(&self) -> &'conn Connection {
        self.conn
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn int_to_bool(value: i64, column: &'static str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}
