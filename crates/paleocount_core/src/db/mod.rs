//! Database file handling for the counting store.
//!
//! # Responsibility
//! - Open `.db` files (or in-memory stores for tests) with pragmas set.
//! - Bring the schema up to the version this build ships.
//!
//! # Invariants
//! - Schema version lives in `PRAGMA user_version`; 0 means a blank file.
//! - A file written by a newer build is refused, never downgraded.
//! - `SqliteStore` refuses connections that skipped this module.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    /// Directory meant to hold the database file does not exist.
    MissingDirectory(PathBuf),
    /// SQLite could not open or create the file at `path`.
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },
    /// Pragma, migration or query failure on an open connection.
    Sqlite(rusqlite::Error),
    /// File was migrated by a newer build than this one.
    SchemaTooNew { found: u32, supported: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingDirectory(dir) => {
                write!(f, "database directory `{}` does not exist", dir.display())
            }
            Self::Open { path, source } => {
                write!(f, "cannot open database `{}`: {source}", path.display())
            }
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "counting database is at schema {found}, this build reads up to {supported}; upgrade paleocount"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open { source, .. } => Some(source),
            Self::Sqlite(err) => Some(err),
            Self::MissingDirectory(_) | Self::SchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
