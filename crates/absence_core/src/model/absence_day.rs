//! Absence-day domain model.
//!
//! # Responsibility
//! - Define the stored absence record and the request shapes that create or
//!   change it.
//! - Own structural validation (required fields, id ranges, date ranges,
//!   years) that does not need storage access.
//!
//! # Invariants
//! - `(employee_id, absence_date)` is unique across stored records.
//! - `id` is assigned by storage on insert and never changes.

use crate::model::reference::{AbsenceType, AbsenceTypeId, Employee, EmployeeId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Surrogate key of one stored absence day.
pub type AbsenceDayId = i64;

/// Label used in holiday-collision messages when the holiday has no name.
pub const GENERIC_HOLIDAY_LABEL: &str = "public holiday";

/// One calendar-day absence of one employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsenceDay {
    pub id: AbsenceDayId,
    pub absence_date: NaiveDate,
    pub employee_id: EmployeeId,
    pub absence_type_id: AbsenceTypeId,
}

impl AbsenceDay {
    /// Returns whether this record occupies the given employee/date slot.
    pub fn occupies(&self, employee_id: EmployeeId, date: NaiveDate) -> bool {
        self.employee_id == employee_id && self.absence_date == date
    }
}

/// Fully validated absence that has not been persisted yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NewAbsenceDay {
    pub absence_date: NaiveDate,
    pub employee_id: EmployeeId,
    pub absence_type_id: AbsenceTypeId,
}

impl NewAbsenceDay {
    /// Attaches the storage-assigned id.
    pub fn with_id(self, id: AbsenceDayId) -> AbsenceDay {
        AbsenceDay {
            id,
            absence_date: self.absence_date,
            employee_id: self.employee_id,
            absence_type_id: self.absence_type_id,
        }
    }
}

/// Caller input for create and update.
///
/// Every field is optional so that one shape serves both full creation
/// (all fields required) and partial update (absent fields keep their value).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsenceDayRequest {
    pub absence_date: Option<NaiveDate>,
    pub employee_id: Option<EmployeeId>,
    pub absence_type_id: Option<AbsenceTypeId>,
}

impl AbsenceDayRequest {
    /// Builds a request with every field present.
    pub fn new(
        absence_date: NaiveDate,
        employee_id: EmployeeId,
        absence_type_id: AbsenceTypeId,
    ) -> Self {
        Self {
            absence_date: Some(absence_date),
            employee_id: Some(employee_id),
            absence_type_id: Some(absence_type_id),
        }
    }

    /// Checks that all creation fields are present and well formed.
    ///
    /// # Errors
    /// - `MissingAbsenceDate`, `MissingEmployee`, `MissingAbsenceType` when a
    ///   field is absent, checked in that order.
    /// - `InvalidId` when an id is not positive.
    pub fn require_complete(&self) -> Result<NewAbsenceDay, AbsenceValidationError> {
        let absence_date = self
            .absence_date
            .ok_or(AbsenceValidationError::MissingAbsenceDate)?;
        let employee_id = self
            .employee_id
            .ok_or(AbsenceValidationError::MissingEmployee)?;
        let absence_type_id = self
            .absence_type_id
            .ok_or(AbsenceValidationError::MissingAbsenceType)?;

        validate_id("employee_id", employee_id)?;
        validate_id("absence_type_id", absence_type_id)?;

        Ok(NewAbsenceDay {
            absence_date,
            employee_id,
            absence_type_id,
        })
    }
}

/// Convenience filter accepted by `AbsenceRegistry::filter`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsenceDayFilter {
    pub employee_id: Option<EmployeeId>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub year: Option<i32>,
    pub absence_type_id: Option<AbsenceTypeId>,
}

/// The single query dimension a filter resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsenceQuery {
    Employee {
        employee_id: EmployeeId,
    },
    DateRange {
        employee_id: EmployeeId,
        start: NaiveDate,
        end: NaiveDate,
    },
    Year {
        employee_id: EmployeeId,
        year: i32,
    },
    AbsenceType {
        employee_id: EmployeeId,
        absence_type_id: AbsenceTypeId,
    },
}

impl AbsenceDayFilter {
    /// Picks exactly one query dimension.
    ///
    /// Precedence: date range (both bounds required) > year > absence type >
    /// all absences of the employee. Lower-priority criteria are ignored, not
    /// intersected.
    pub fn resolve(&self) -> Result<AbsenceQuery, AbsenceValidationError> {
        let employee_id = self
            .employee_id
            .ok_or(AbsenceValidationError::MissingEmployee)?;

        let query = match (self.start_date, self.end_date, self.year, self.absence_type_id) {
            (Some(start), Some(end), _, _) => AbsenceQuery::DateRange {
                employee_id,
                start,
                end,
            },
            (_, _, Some(year), _) => AbsenceQuery::Year { employee_id, year },
            (_, _, None, Some(absence_type_id)) => AbsenceQuery::AbsenceType {
                employee_id,
                absence_type_id,
            },
            _ => AbsenceQuery::Employee { employee_id },
        };
        Ok(query)
    }
}

/// Number of absence days of one type, as returned by aggregate queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsenceTypeCount {
    pub absence_type_id: AbsenceTypeId,
    /// `None` when the type can no longer be resolved.
    pub absence_type_name: Option<String>,
    pub absence_type_label: Option<String>,
    pub count: u64,
}

/// Absence record together with the reference snapshots it points at.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsenceDayDetails {
    pub absence_day: AbsenceDay,
    pub employee: Option<Employee>,
    pub absence_type: Option<AbsenceType>,
}

/// Structural or rule violations detected before any write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbsenceValidationError {
    MissingAbsenceDate,
    MissingEmployee,
    MissingAbsenceType,
    InvalidId { field: &'static str, value: i64 },
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    InvalidYear(i32),
    EmptyBatch,
    PublicHoliday { date: NaiveDate, name: String },
}

impl Display for AbsenceValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingAbsenceDate => write!(f, "absence date must be specified"),
            Self::MissingEmployee => write!(f, "employee must be specified"),
            Self::MissingAbsenceType => write!(f, "absence type must be specified"),
            Self::InvalidId { field, value } => {
                write!(f, "{field} must be a positive id, got {value}")
            }
            Self::InvalidDateRange { start, end } => {
                write!(f, "start date {start} cannot be after end date {end}")
            }
            Self::InvalidYear(year) => write!(f, "year must be a positive number, got {year}"),
            Self::EmptyBatch => write!(f, "absence list cannot be empty"),
            Self::PublicHoliday { date, name } => {
                write!(f, "cannot create absence on public holiday: {date} ({name})")
            }
        }
    }
}

impl Error for AbsenceValidationError {}

/// Rejects ids that storage can never have assigned.
pub fn validate_id(field: &'static str, value: i64) -> Result<(), AbsenceValidationError> {
    if value <= 0 {
        return Err(AbsenceValidationError::InvalidId { field, value });
    }
    Ok(())
}

/// Rejects inverted ranges. Bounds are inclusive, so `start == end` is valid.
pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> Result<(), AbsenceValidationError> {
    if start > end {
        return Err(AbsenceValidationError::InvalidDateRange { start, end });
    }
    Ok(())
}

/// Returns the first and last day of `year`.
pub fn year_bounds(year: i32) -> Result<(NaiveDate, NaiveDate), AbsenceValidationError> {
    if year <= 0 {
        return Err(AbsenceValidationError::InvalidYear(year));
    }
    let first = NaiveDate::from_ymd_opt(year, 1, 1);
    let last = NaiveDate::from_ymd_opt(year, 12, 31);
    match (first, last) {
        (Some(first), Some(last)) => Ok((first, last)),
        _ => Err(AbsenceValidationError::InvalidYear(year)),
    }
}
