//! Reference entities owned by other stores.
//!
//! The registry only reads these; it stores their ids and resolves them at
//! write time.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type EmployeeId = i64;
pub type AbsenceTypeId = i64;
pub type PublicHolidayId = i64;

/// Employee snapshot as seen by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: EmployeeId,
    pub first_name: String,
    pub last_name: String,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Category of an absence (vacation, sick leave, training, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsenceType {
    pub id: AbsenceTypeId,
    pub name: String,
    /// Short code shown in calendars, e.g. `U` for vacation.
    pub label: Option<String>,
    /// Hours credited for one day of this type.
    pub hours: Option<u8>,
    /// Whether the type counts against the holiday allowance.
    pub is_holiday: bool,
    /// Fraction of a working day, e.g. `0.5` for half days.
    pub share_of_day: Option<f64>,
}

/// Named public holiday on a fixed calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicHoliday {
    pub id: PublicHolidayId,
    pub date: NaiveDate,
    pub name: String,
    pub is_fixed_date: bool,
    pub sequence_no: Option<i32>,
}
