//! Core domain logic for course enrollment.
//! This crate is the single source of truth for scheduling and enrollment
//! invariants.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use clock::{Clock, FixedClock, SystemClock, Term};
pub use config::CoreConfig;
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::enrollment::{EnrollmentItem, EnrollmentRecord, ItemStatus, RecordStatus};
pub use model::principal::{Principal, Role, UserId};
pub use model::section::{NewSection, SectionDetail, SectionId, SectionPatch, TimeWindow};
pub use repo::catalog_repo::SqliteCatalogRepository;
pub use repo::enrollment_repo::SqliteEnrollmentRepository;
pub use repo::section_repo::SqliteSectionRepository;
pub use repo::{RepoError, RepoResult};
pub use service::advisor_service::AdvisorService;
pub use service::catalog_service::{CatalogError, CatalogService, NewUser};
pub use service::errors::{EnrollmentError, ErrorKind};
pub use service::section_service::{SectionService, SectionServiceError};
pub use service::student_service::StudentService;

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
