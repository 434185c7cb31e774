//! Absence-day storage contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and predicate queries over `absence_days`.
//! - Enforce `(employee_id, absence_date)` uniqueness at the storage layer
//!   and report violations as `RepoError::Duplicate`.
//! - Expose the transaction boundary used by the registry.
//!
//! # Invariants
//! - Rows are returned ordered by `absence_date ASC, id ASC`.
//! - Read paths reject malformed persisted dates instead of masking them.

use crate::db::DbError;
use crate::model::absence_day::{AbsenceDay, AbsenceDayId, NewAbsenceDay};
use crate::model::reference::{AbsenceTypeId, EmployeeId};
use crate::repo::schema::ensure_table_ready;
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const ABSENCE_DAY_SELECT_SQL: &str = "SELECT
    id,
    absence_date,
    employee_id,
    absence_type_id
FROM absence_days";

const ABSENCE_DAY_COLUMNS: &[&str] = &[
    "id",
    "absence_date",
    "employee_id",
    "absence_type_id",
    "created_at",
    "updated_at",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for absence and reference persistence.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// No absence day with this id.
    NotFound(AbsenceDayId),
    /// The storage uniqueness constraint on `(employee_id, absence_date)` fired.
    Duplicate {
        employee_id: EmployeeId,
        absence_date: NaiveDate,
    },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "absence day not found: {id}"),
            Self::Duplicate {
                employee_id,
                absence_date,
            } => write!(
                f,
                "absence already exists for employee {employee_id} on {absence_date}"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "repository requires column `{column}` in table `{table}`")
            }
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
        Self::Db(DbError::Sqlite(value))
    }
}

/// Predicate set for listing and counting absence days.
///
/// All present predicates are combined with AND; date bounds are inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AbsenceDayListQuery {
    pub employee_id: Option<EmployeeId>,
    pub absence_type_id: Option<AbsenceTypeId>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl AbsenceDayListQuery {
    pub fn for_employee(employee_id: EmployeeId) -> Self {
        Self {
            employee_id: Some(employee_id),
            ..Self::default()
        }
    }

    pub fn between(mut self, date_from: NaiveDate, date_to: NaiveDate) -> Self {
        self.date_from = Some(date_from);
        self.date_to = Some(date_to);
        self
    }

    pub fn of_type(mut self, absence_type_id: AbsenceTypeId) -> Self {
        self.absence_type_id = Some(absence_type_id);
        self
    }
}

/// Storage adapter for absence days.
pub trait AbsenceDayRepository {
    /// Runs `f` inside one transaction: commit on `Ok`, rollback on `Err`.
    ///
    /// Calls made while a transaction is already open join it.
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<RepoError>;
    /// Inserts one record and returns it with its assigned id.
    fn insert(&self, draft: &NewAbsenceDay) -> RepoResult<AbsenceDay>;
    /// Inserts all records atomically, preserving input order.
    fn insert_all(&self, drafts: &[NewAbsenceDay]) -> RepoResult<Vec<AbsenceDay>>;
    fn get(&self, id: AbsenceDayId) -> RepoResult<Option<AbsenceDay>>;
    fn exists(&self, id: AbsenceDayId) -> RepoResult<bool>;
    /// Replaces date, employee and type of an existing record.
    fn update(&self, record: &AbsenceDay) -> RepoResult<()>;
    fn delete(&self, id: AbsenceDayId) -> RepoResult<()>;
    /// Uniqueness probe; `exclude_id` skips the record being updated.
    fn exists_by_employee_and_date(
        &self,
        employee_id: EmployeeId,
        absence_date: NaiveDate,
        exclude_id: Option<AbsenceDayId>,
    ) -> RepoResult<bool>;
    fn list(&self, query: &AbsenceDayListQuery) -> RepoResult<Vec<AbsenceDay>>;
    fn count(&self, query: &AbsenceDayListQuery) -> RepoResult<u64>;
    /// Counts matching rows grouped by absence type, ordered by type id.
    fn count_by_type(
        &self,
        query: &AbsenceDayListQuery,
    ) -> RepoResult<Vec<(AbsenceTypeId, u64)>>;
}

/// SQLite-backed absence-day repository.
pub struct SqliteAbsenceDayRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAbsenceDayRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(conn, "absence_days", ABSENCE_DAY_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl AbsenceDayRepository for SqliteAbsenceDayRepository<'_> {
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<RepoError>,
    {
        if !self.conn.is_autocommit() {
            return f();
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(RepoError::from)?;
        // Dropping `tx` on the error path rolls back.
        let value = f()?;
        tx.commit().map_err(RepoError::from)?;
        Ok(value)
    }

    fn insert(&self, draft: &NewAbsenceDay) -> RepoResult<AbsenceDay> {
        self.conn
            .execute(
                "INSERT INTO absence_days (
                    absence_date,
                    employee_id,
                    absence_type_id
                ) VALUES (?1, ?2, ?3);",
                params![
                    date_to_db(draft.absence_date),
                    draft.employee_id,
                    draft.absence_type_id,
                ],
            )
            .map_err(|err| map_write_error(err, draft.employee_id, draft.absence_date))?;

        Ok(draft.with_id(self.conn.last_insert_rowid()))
    }

    fn insert_all(&self, drafts: &[NewAbsenceDay]) -> RepoResult<Vec<AbsenceDay>> {
        self.transaction(|| drafts.iter().map(|draft| self.insert(draft)).collect())
    }

    fn get(&self, id: AbsenceDayId) -> RepoResult<Option<AbsenceDay>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ABSENCE_DAY_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_absence_day_row(row)?));
        }
        Ok(None)
    }

    fn exists(&self, id: AbsenceDayId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM absence_days WHERE id = ?1);",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn update(&self, record: &AbsenceDay) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE absence_days
                 SET
                    absence_date = ?1,
                    employee_id = ?2,
                    absence_type_id = ?3,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?4;",
                params![
                    date_to_db(record.absence_date),
                    record.employee_id,
                    record.absence_type_id,
                    record.id,
                ],
            )
            .map_err(|err| map_write_error(err, record.employee_id, record.absence_date))?;

        if changed == 0 {
            return Err(RepoError::NotFound(record.id));
        }
        Ok(())
    }

    fn delete(&self, id: AbsenceDayId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM absence_days WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn exists_by_employee_and_date(
        &self,
        employee_id: EmployeeId,
        absence_date: NaiveDate,
        exclude_id: Option<AbsenceDayId>,
    ) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM absence_days
                WHERE employee_id = ?1
                  AND absence_date = ?2
                  AND (?3 IS NULL OR id <> ?3)
            );",
            params![employee_id, date_to_db(absence_date), exclude_id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn list(&self, query: &AbsenceDayListQuery) -> RepoResult<Vec<AbsenceDay>> {
        let (predicate, bind_values) = build_predicate(query);
        let sql =
            format!("{ABSENCE_DAY_SELECT_SQL}{predicate} ORDER BY absence_date ASC, id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_absence_day_row(row)?);
        }
        Ok(records)
    }

    fn count(&self, query: &AbsenceDayListQuery) -> RepoResult<u64> {
        let (predicate, bind_values) = build_predicate(query);
        let sql = format!("SELECT COUNT(*) FROM absence_days{predicate};");
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(bind_values), |row| row.get(0))?;
        count_from_db(count)
    }

    fn count_by_type(
        &self,
        query: &AbsenceDayListQuery,
    ) -> RepoResult<Vec<(AbsenceTypeId, u64)>> {
        let (predicate, bind_values) = build_predicate(query);
        let sql = format!(
            "SELECT absence_type_id, COUNT(*)
             FROM absence_days{predicate}
             GROUP BY absence_type_id
             ORDER BY absence_type_id ASC;"
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut counts = Vec::new();
        while let Some(row) = rows.next()? {
            let absence_type_id: AbsenceTypeId = row.get(0)?;
            let count: i64 = row.get(1)?;
            counts.push((absence_type_id, count_from_db(count)?));
        }
        Ok(counts)
    }
}

fn build_predicate(query: &AbsenceDayListQuery) -> (String, Vec<Value>) {
    let mut sql = String::from(" WHERE 1 = 1");
    let mut bind_values: Vec<Value> = Vec::new();

    if let Some(employee_id) = query.employee_id {
        sql.push_str(" AND employee_id = ?");
        bind_values.push(Value::Integer(employee_id));
    }
    if let Some(absence_type_id) = query.absence_type_id {
        sql.push_str(" AND absence_type_id = ?");
        bind_values.push(Value::Integer(absence_type_id));
    }
    if let Some(date_from) = query.date_from {
        sql.push_str(" AND absence_date >= ?");
        bind_values.push(Value::Text(date_to_db(date_from)));
    }
    if let Some(date_to) = query.date_to {
        sql.push_str(" AND absence_date <= ?");
        bind_values.push(Value::Text(date_to_db(date_to)));
    }

    (sql, bind_values)
}

fn map_write_error(
    err: rusqlite::Error,
    employee_id: EmployeeId,
    absence_date: NaiveDate,
) -> RepoError {
    if is_unique_violation(&err) {
        RepoError::Duplicate {
            employee_id,
            absence_date,
        }
    } else {
        err.into()
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn parse_absence_day_row(row: &Row<'_>) -> RepoResult<AbsenceDay> {
    let date_text: String = row.get("absence_date")?;
    Ok(AbsenceDay {
        id: row.get("id")?,
        absence_date: parse_date(&date_text, "absence_days.absence_date")?,
        employee_id: row.get("employee_id")?,
        absence_type_id: row.get("absence_type_id")?,
    })
}

/// Dates are stored as ISO `YYYY-MM-DD` text, which sorts chronologically.
pub(crate) fn date_to_db(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn parse_date(value: &str, column: &'static str) -> RepoResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| RepoError::InvalidData(format!("invalid date `{value}` in {column}")))
}

fn count_from_db(value: i64) -> RepoResult<u64> {
    u64::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("negative row count `{value}`")))
}
