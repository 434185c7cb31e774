//! Domain model for employee absence tracking.
//!
//! # Responsibility
//! - Define the absence-day record owned by the registry.
//! - Define read-only snapshots of the reference entities it points at.
//!
//! # Invariants
//! - An employee has at most one absence day per calendar date.
//! - Absence days never fall on a registered public holiday.

pub mod absence_day;
pub mod reference;
