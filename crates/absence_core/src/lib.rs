//! Core domain logic for the employee absence registry.
//! This crate is the single source of truth for absence invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::absence_day::{
    AbsenceDay, AbsenceDayDetails, AbsenceDayFilter, AbsenceDayId, AbsenceDayRequest,
    AbsenceQuery, AbsenceTypeCount, AbsenceValidationError, NewAbsenceDay,
};
pub use model::reference::{
    AbsenceType, AbsenceTypeId, Employee, EmployeeId, PublicHoliday, PublicHolidayId,
};
pub use repo::absence_day_repo::{
    AbsenceDayListQuery, AbsenceDayRepository, RepoError, RepoResult, SqliteAbsenceDayRepository,
};
pub use repo::reference_repo::{
    AbsenceTypeLookup, EmployeeLookup, NewAbsenceType, PublicHolidayLookup, SqliteReferenceStore,
};
pub use service::absence_registry::{
    AbsenceRegistry, AbsenceServiceError, ErrorKind, ServiceResult,
};

/// Registry wired to SQLite storage and SQLite reference lookups on one
/// connection.
pub type SqliteAbsenceRegistry<'conn> = AbsenceRegistry<
    SqliteAbsenceDayRepository<'conn>,
    SqliteReferenceStore<'conn>,
    SqliteReferenceStore<'conn>,
    SqliteReferenceStore<'conn>,
>;

/// Builds a registry whose storage and lookups share `conn`.
pub fn sqlite_registry(conn: &rusqlite::Connection) -> RepoResult<SqliteAbsenceRegistry<'_>> {
    let repo = SqliteAbsenceDayRepository::try_new(conn)?;
    let references = SqliteReferenceStore::try_new(conn)?;
    Ok(AbsenceRegistry::new(repo, references, references, references))
}

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
