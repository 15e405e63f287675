//! Record-management core for paleontological counting.
//! Every business invariant (validation, authorization, uniqueness,
//! tally aggregation) lives in this crate.

pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod outcome;
pub mod repo;
pub mod service;
pub mod summary;
pub mod validate;

pub use auth::{Authorizer, FixedAuthorizer, ParticipationAuthorizer};
pub use config::{ConfigError, ConfigOverrides, CoreConfig};
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use outcome::{Failure, OperationResult, Outcome};
pub use repo::{RepoError, RepoResult, SqliteStore};
pub use service::counting_service::CountingService;
pub use service::occurrence_service::OccurrenceService;
pub use service::project_service::{ParticipationService, ProjectService};
pub use service::section_service::{SampleService, SectionService};
pub use service::taxonomy_service::TaxonomyService;
pub use service::user_service::UserService;
pub use summary::{summarize, CountingSummary, SampleReport, TallyEntry};
pub use validate::{ErrorCode, FieldErrors, RawParams};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
