//! Read-only lookups into employee, absence-type and public-holiday stores.
//!
//! # Responsibility
//! - Define the collaborator contracts the absence registry resolves
//!   references through.
//! - Provide a SQLite implementation plus seed helpers for local tooling and
//!   tests.
//!
//! # Invariants
//! - Lookups never mutate reference data.
//! - At most one public holiday exists per calendar date.

use crate::model::reference::{
    AbsenceType, AbsenceTypeId, Employee, EmployeeId, PublicHoliday,
};
use crate::repo::absence_day_repo::{date_to_db, parse_date, RepoError, RepoResult};
use crate::repo::schema::ensure_table_ready;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

const EMPLOYEE_COLUMNS: &[&str] = &["id", "first_name", "last_name"];
const ABSENCE_TYPE_COLUMNS: &[&str] = &[
    "id",
    "name",
    "label",
    "hours",
    "is_holiday",
    "share_of_day",
];
const PUBLIC_HOLIDAY_COLUMNS: &[&str] =
    &["id", "holiday_date", "name", "is_fixed_date", "sequence_no"];

/// Resolves employees by id.
pub trait EmployeeLookup {
    fn find_employee(&self, id: EmployeeId) -> RepoResult<Option<Employee>>;
}

/// Resolves absence types by id.
pub trait AbsenceTypeLookup {
    fn find_absence_type(&self, id: AbsenceTypeId) -> RepoResult<Option<AbsenceType>>;
    /// Lists all known types ordered by id.
    fn list_absence_types(&self) -> RepoResult<Vec<AbsenceType>>;
}

/// Answers whether a date is a public holiday.
pub trait PublicHolidayLookup {
    fn holiday_exists_on(&self, date: NaiveDate) -> RepoResult<bool>;
    /// Used only to name the holiday in error messages.
    fn find_holiday_by_date(&self, date: NaiveDate) -> RepoResult<Option<PublicHoliday>>;
}

impl<T: EmployeeLookup + ?Sized> EmployeeLookup for &T {
    fn find_employee(&self, id: EmployeeId) -> RepoResult<Option<Employee>> {
        (**self).find_employee(id)
    }
}

impl<T: AbsenceTypeLookup + ?Sized> AbsenceTypeLookup for &T {
    fn find_absence_type(&self, id: AbsenceTypeId) -> RepoResult<Option<AbsenceType>> {
        (**self).find_absence_type(id)
    }

    fn list_absence_types(&self) -> RepoResult<Vec<AbsenceType>> {
        (**self).list_absence_types()
    }
}

impl<T: PublicHolidayLookup + ?Sized> PublicHolidayLookup for &T {
    fn holiday_exists_on(&self, date: NaiveDate) -> RepoResult<bool> {
        (**self).holiday_exists_on(date)
    }

    fn find_holiday_by_date(&self, date: NaiveDate) -> RepoResult<Option<PublicHoliday>> {
        (**self).find_holiday_by_date(date)
    }
}

/// Seed input for an absence type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewAbsenceType {
    pub name: String,
    pub label: Option<String>,
    pub hours: Option<u8>,
    pub is_holiday: bool,
    pub share_of_day: Option<f64>,
}

impl NewAbsenceType {
    pub fn named(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: Some(label.into()),
            ..Self::default()
        }
    }
}

/// SQLite-backed reference store implementing all three lookups.
#[derive(Clone, Copy)]
pub struct SqliteReferenceStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteReferenceStore<'conn> {
    /// Creates store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(conn, "employees", EMPLOYEE_COLUMNS)?;
        ensure_table_ready(conn, "absence_types", ABSENCE_TYPE_COLUMNS)?;
        ensure_table_ready(conn, "public_holidays", PUBLIC_HOLIDAY_COLUMNS)?;
        Ok(Self { conn })
    }

    pub fn insert_employee(&self, first_name: &str, last_name: &str) -> RepoResult<Employee> {
        self.conn.execute(
            "INSERT INTO employees (first_name, last_name) VALUES (?1, ?2);",
            params![first_name, last_name],
        )?;
        Ok(Employee {
            id: self.conn.last_insert_rowid(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        })
    }

    pub fn insert_absence_type(&self, draft: &NewAbsenceType) -> RepoResult<AbsenceType> {
        self.conn.execute(
            "INSERT INTO absence_types (name, label, hours, is_holiday, share_of_day)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                draft.name.as_str(),
                draft.label.as_deref(),
                draft.hours,
                draft.is_holiday,
                draft.share_of_day,
            ],
        )?;
        Ok(AbsenceType {
            id: self.conn.last_insert_rowid(),
            name: draft.name.clone(),
            label: draft.label.clone(),
            hours: draft.hours,
            is_holiday: draft.is_holiday,
            share_of_day: draft.share_of_day,
        })
    }

    /// Registers a holiday; the sequence number continues after the current
    /// maximum.
    pub fn insert_public_holiday(
        &self,
        date: NaiveDate,
        name: &str,
        is_fixed_date: bool,
    ) -> RepoResult<PublicHoliday> {
        let sequence_no: i32 = self.conn.query_row(
            "SELECT COALESCE(MAX(sequence_no), 0) + 1 FROM public_holidays;",
            [],
            |row| row.get(0),
        )?;
        self.conn.execute(
            "INSERT INTO public_holidays (holiday_date, name, is_fixed_date, sequence_no)
             VALUES (?1, ?2, ?3, ?4);",
            params![date_to_db(date), name, is_fixed_date, sequence_no],
        )?;
        Ok(PublicHoliday {
            id: self.conn.last_insert_rowid(),
            date,
            name: name.to_string(),
            is_fixed_date,
            sequence_no: Some(sequence_no),
        })
    }
}

impl EmployeeLookup for SqliteReferenceStore<'_> {
    fn find_employee(&self, id: EmployeeId) -> RepoResult<Option<Employee>> {
        let employee = self
            .conn
            .query_row(
                "SELECT id, first_name, last_name FROM employees WHERE id = ?1;",
                [id],
                |row| {
                    Ok(Employee {
                        id: row.get("id")?,
                        first_name: row.get("first_name")?,
                        last_name: row.get("last_name")?,
                    })
                },
            )
            .optional()?;
        Ok(employee)
    }
}

impl AbsenceTypeLookup for SqliteReferenceStore<'_> {
    fn find_absence_type(&self, id: AbsenceTypeId) -> RepoResult<Option<AbsenceType>> {
        let absence_type = self
            .conn
            .query_row(
                "SELECT id, name, label, hours, is_holiday, share_of_day
                 FROM absence_types
                 WHERE id = ?1;",
                [id],
                parse_absence_type_row,
            )
            .optional()?;
        Ok(absence_type)
    }

    fn list_absence_types(&self) -> RepoResult<Vec<AbsenceType>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, label, hours, is_holiday, share_of_day
             FROM absence_types
             ORDER BY id ASC;",
        )?;
        let types = stmt
            .query_map([], parse_absence_type_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(types)
    }
}

impl PublicHolidayLookup for SqliteReferenceStore<'_> {
    fn holiday_exists_on(&self, date: NaiveDate) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM public_holidays WHERE holiday_date = ?1);",
            [date_to_db(date)],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn find_holiday_by_date(&self, date: NaiveDate) -> RepoResult<Option<PublicHoliday>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, holiday_date, name, is_fixed_date, sequence_no
             FROM public_holidays
             WHERE holiday_date = ?1;",
        )?;
        let mut rows = stmt.query([date_to_db(date)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_public_holiday_row(row)?));
        }
        Ok(None)
    }
}

fn parse_absence_type_row(row: &Row<'_>) -> rusqlite::Result<AbsenceType> {
    Ok(AbsenceType {
        id: row.get("id")?,
        name: row.get("name")?,
        label: row.get("label")?,
        hours: row.get("hours")?,
        is_holiday: row.get("is_holiday")?,
        share_of_day: row.get("share_of_day")?,
    })
}

fn parse_public_holiday_row(row: &Row<'_>) -> RepoResult<PublicHoliday> {
    let date_text: String = row.get("holiday_date")?;
    let is_fixed_date = match row.get::<_, i64>("is_fixed_date")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_fixed_date value `{other}` in public_holidays.is_fixed_date"
            )));
        }
    };

    Ok(PublicHoliday {
        id: row.get("id")?,
        date: parse_date(&date_text, "public_holidays.holiday_date")?,
        name: row.get("name")?,
        is_fixed_date,
        sequence_no: row.get("sequence_no")?,
    })
}
