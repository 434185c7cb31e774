//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define storage contracts consumed by the absence registry.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repositories only accept connections migrated to the latest schema.
//! - Storage-level constraint failures surface as semantic errors
//!   (`Duplicate`, `NotFound`) rather than raw SQLite errors.

pub mod absence_day_repo;
pub mod reference_repo;
mod schema;
