//! Absence registry use-case service.
//!
//! # Responsibility
//! - Register, change, query and remove employee absence days.
//! - Resolve employee and absence-type references through injected lookups.
//! - Report per-type aggregates for one employee.
//!
//! # Invariants
//! - An employee has at most one absence day per date. The pre-check is
//!   backed by the storage unique index, whose violations map to
//!   `AbsenceServiceError::Duplicate` as well.
//! - No absence day is stored on a public holiday.
//! - Every write runs in one storage transaction; any error leaves storage
//!   unchanged.
//! - Bulk registration validates the whole batch before the first write.

use crate::model::absence_day::{
    validate_date_range, validate_id, year_bounds, AbsenceDay, AbsenceDayDetails,
    AbsenceDayFilter, AbsenceDayId, AbsenceDayRequest, AbsenceQuery, AbsenceTypeCount,
    AbsenceValidationError, NewAbsenceDay, GENERIC_HOLIDAY_LABEL,
};
use crate::model::reference::{AbsenceType, AbsenceTypeId, Employee, EmployeeId};
use crate::repo::absence_day_repo::{AbsenceDayListQuery, AbsenceDayRepository, RepoError};
use crate::repo::reference_repo::{AbsenceTypeLookup, EmployeeLookup, PublicHolidayLookup};
use chrono::NaiveDate;
use log::{debug, info, warn};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Coarse classification a presentation layer maps to client statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Duplicate,
    Storage,
}

/// Errors from absence registry operations.
#[derive(Debug)]
pub enum AbsenceServiceError {
    /// Missing or malformed input, or a public-holiday collision.
    Validation(AbsenceValidationError),
    AbsenceDayNotFound(AbsenceDayId),
    EmployeeNotFound(EmployeeId),
    AbsenceTypeNotFound(AbsenceTypeId),
    /// The employee already has an absence on this date.
    Duplicate {
        employee_id: EmployeeId,
        absence_date: NaiveDate,
    },
    /// Repository-level failure.
    Repo(RepoError),
}

impl AbsenceServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::AbsenceDayNotFound(_)
            | Self::EmployeeNotFound(_)
            | Self::AbsenceTypeNotFound(_) => ErrorKind::NotFound,
            Self::Duplicate { .. } => ErrorKind::Duplicate,
            Self::Repo(_) => ErrorKind::Storage,
        }
    }
}

impl Display for AbsenceServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::AbsenceDayNotFound(id) => write!(f, "absence day not found with id: {id}"),
            Self::EmployeeNotFound(id) => write!(f, "employee not found with id: {id}"),
            Self::AbsenceTypeNotFound(id) => write!(f, "absence type not found with id: {id}"),
            Self::Duplicate {
                employee_id,
                absence_date,
            } => write!(
                f,
                "absence already exists for employee id {employee_id} on date {absence_date}"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AbsenceServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AbsenceValidationError> for AbsenceServiceError {
    fn from(value: AbsenceValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for AbsenceServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::AbsenceDayNotFound(id),
            RepoError::Duplicate {
                employee_id,
                absence_date,
            } => Self::Duplicate {
                employee_id,
                absence_date,
            },
            other => Self::Repo(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, AbsenceServiceError>;

/// Absence registry facade over storage and reference lookups.
pub struct AbsenceRegistry<R, E, T, H> {
    repo: R,
    employees: E,
    absence_types: T,
    holidays: H,
}

impl<R, E, T, H> AbsenceRegistry<R, E, T, H>
where
    R: AbsenceDayRepository,
    E: EmployeeLookup,
    T: AbsenceTypeLookup,
    H: PublicHolidayLookup,
{
    pub fn new(repo: R, employees: E, absence_types: T, holidays: H) -> Self {
        Self {
            repo,
            employees,
            absence_types,
            holidays,
        }
    }

    /// Registers one absence day.
    ///
    /// # Errors
    /// - `Validation` for missing fields or a public-holiday date.
    /// - `EmployeeNotFound` / `AbsenceTypeNotFound` for unresolved references.
    /// - `Duplicate` when the employee already has an absence on that date.
    pub fn create(&self, request: &AbsenceDayRequest) -> ServiceResult<AbsenceDay> {
        let created = self.repo.transaction(|| {
            let draft = self.validate_new(request)?;
            self.ensure_not_persisted(draft.employee_id, draft.absence_date, None)?;
            Ok::<_, AbsenceServiceError>(self.repo.insert(&draft)?)
        });

        match &created {
            Ok(record) => info!(
                "event=absence_create module=absence status=ok id={} employee_id={}",
                record.id, record.employee_id
            ),
            Err(err) => warn!(
                "event=absence_create module=absence status=error kind={:?} error={err}",
                err.kind()
            ),
        }
        created
    }

    /// Registers a batch of absence days with all-or-nothing semantics.
    ///
    /// Every request is validated like `create` before anything is written.
    /// Two requests for the same employee and date within one batch are
    /// rejected as `Duplicate`.
    pub fn create_bulk(&self, requests: &[AbsenceDayRequest]) -> ServiceResult<Vec<AbsenceDay>> {
        if requests.is_empty() {
            return Err(AbsenceValidationError::EmptyBatch.into());
        }

        let created = self.repo.transaction(|| {
            let mut drafts = Vec::with_capacity(requests.len());
            let mut seen = HashSet::with_capacity(requests.len());
            for request in requests {
                let draft = self.validate_new(request)?;
                self.ensure_not_persisted(draft.employee_id, draft.absence_date, None)?;
                if !seen.insert((draft.employee_id, draft.absence_date)) {
                    return Err(AbsenceServiceError::Duplicate {
                        employee_id: draft.employee_id,
                        absence_date: draft.absence_date,
                    });
                }
                drafts.push(draft);
            }
            Ok::<_, AbsenceServiceError>(self.repo.insert_all(&drafts)?)
        });

        match &created {
            Ok(records) => info!(
                "event=absence_create_bulk module=absence status=ok count={}",
                records.len()
            ),
            Err(err) => warn!(
                "event=absence_create_bulk module=absence status=error batch_size={} kind={:?} error={err}",
                requests.len(),
                err.kind()
            ),
        }
        created
    }

    pub fn find_by_id(&self, id: AbsenceDayId) -> ServiceResult<Option<AbsenceDay>> {
        validate_id("id", id)?;
        Ok(self.repo.get(id)?)
    }

    /// Loads one record with its employee and absence-type snapshots.
    ///
    /// References that no longer resolve are reported as `None`.
    pub fn find_with_references(
        &self,
        id: AbsenceDayId,
    ) -> ServiceResult<Option<AbsenceDayDetails>> {
        let Some(absence_day) = self.find_by_id(id)? else {
            return Ok(None);
        };
        let employee = self.employees.find_employee(absence_day.employee_id)?;
        let absence_type = self
            .absence_types
            .find_absence_type(absence_day.absence_type_id)?;
        Ok(Some(AbsenceDayDetails {
            absence_day,
            employee,
            absence_type,
        }))
    }

    /// Returns all records ordered by date, then id.
    pub fn find_all(&self) -> ServiceResult<Vec<AbsenceDay>> {
        Ok(self.repo.list(&AbsenceDayListQuery::default())?)
    }

    /// Returns all records ordered by a caller-supplied comparator.
    pub fn find_all_sorted_by<F>(&self, compare: F) -> ServiceResult<Vec<AbsenceDay>>
    where
        F: FnMut(&AbsenceDay, &AbsenceDay) -> Ordering,
    {
        let mut records = self.find_all()?;
        records.sort_by(compare);
        Ok(records)
    }

    /// Applies a partial update; absent request fields keep their value.
    ///
    /// Holiday and uniqueness rules are re-checked only when the date or the
    /// employee actually changes, and the uniqueness scan skips this record.
    pub fn update(
        &self,
        id: AbsenceDayId,
        request: &AbsenceDayRequest,
    ) -> ServiceResult<AbsenceDay> {
        validate_id("id", id)?;

        let updated = self.repo.transaction(|| {
            let existing = self
                .repo
                .get(id)?
                .ok_or(AbsenceServiceError::AbsenceDayNotFound(id))?;
            let mut staged = existing.clone();

            if let Some(employee_id) = request.employee_id {
                if employee_id != existing.employee_id {
                    staged.employee_id = self.resolve_employee(employee_id)?.id;
                }
            }
            if let Some(absence_type_id) = request.absence_type_id {
                if absence_type_id != existing.absence_type_id {
                    staged.absence_type_id = self.resolve_absence_type(absence_type_id)?.id;
                }
            }
            if let Some(absence_date) = request.absence_date {
                staged.absence_date = absence_date;
            }

            let date_changed = staged.absence_date != existing.absence_date;
            let employee_changed = staged.employee_id != existing.employee_id;
            if date_changed {
                self.ensure_not_holiday(staged.absence_date)?;
            }
            if date_changed || employee_changed {
                self.ensure_not_persisted(staged.employee_id, staged.absence_date, Some(id))?;
            }

            if staged != existing {
                self.repo.update(&staged)?;
            }
            Ok::<_, AbsenceServiceError>(staged)
        });

        match &updated {
            Ok(record) => info!(
                "event=absence_update module=absence status=ok id={} employee_id={}",
                record.id, record.employee_id
            ),
            Err(err) => warn!(
                "event=absence_update module=absence status=error id={id} kind={:?} error={err}",
                err.kind()
            ),
        }
        updated
    }

    pub fn delete(&self, id: AbsenceDayId) -> ServiceResult<()> {
        validate_id("id", id)?;
        self.repo.transaction(|| {
            if !self.repo.exists(id)? {
                return Err(AbsenceServiceError::AbsenceDayNotFound(id));
            }
            self.repo.delete(id)?;
            Ok(())
        })?;
        info!("event=absence_delete module=absence status=ok id={id}");
        Ok(())
    }

    pub fn get_by_employee_id(&self, employee_id: EmployeeId) -> ServiceResult<Vec<AbsenceDay>> {
        validate_id("employee_id", employee_id)?;
        Ok(self
            .repo
            .list(&AbsenceDayListQuery::for_employee(employee_id))?)
    }

    /// Lists absences with `start <= date <= end`.
    pub fn get_by_employee_id_and_date_range(
        &self,
        employee_id: EmployeeId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ServiceResult<Vec<AbsenceDay>> {
        validate_id("employee_id", employee_id)?;
        validate_date_range(start, end)?;
        Ok(self
            .repo
            .list(&AbsenceDayListQuery::for_employee(employee_id).between(start, end))?)
    }

    pub fn get_by_employee_id_and_absence_type_id(
        &self,
        employee_id: EmployeeId,
        absence_type_id: AbsenceTypeId,
    ) -> ServiceResult<Vec<AbsenceDay>> {
        validate_id("employee_id", employee_id)?;
        validate_id("absence_type_id", absence_type_id)?;
        Ok(self
            .repo
            .list(&AbsenceDayListQuery::for_employee(employee_id).of_type(absence_type_id))?)
    }

    pub fn get_by_employee_id_and_year(
        &self,
        employee_id: EmployeeId,
        year: i32,
    ) -> ServiceResult<Vec<AbsenceDay>> {
        validate_id("employee_id", employee_id)?;
        let (first, last) = year_bounds(year)?;
        Ok(self
            .repo
            .list(&AbsenceDayListQuery::for_employee(employee_id).between(first, last))?)
    }

    pub fn exists_by_employee_id_and_absence_date(
        &self,
        employee_id: EmployeeId,
        absence_date: NaiveDate,
    ) -> ServiceResult<bool> {
        validate_id("employee_id", employee_id)?;
        Ok(self
            .repo
            .exists_by_employee_and_date(employee_id, absence_date, None)?)
    }

    /// Returns 0 when nothing matches.
    pub fn count_by_employee_id_and_absence_type_id_and_year(
        &self,
        employee_id: EmployeeId,
        absence_type_id: AbsenceTypeId,
        year: i32,
    ) -> ServiceResult<u64> {
        validate_id("employee_id", employee_id)?;
        validate_id("absence_type_id", absence_type_id)?;
        let (first, last) = year_bounds(year)?;
        let query = AbsenceDayListQuery::for_employee(employee_id)
            .of_type(absence_type_id)
            .between(first, last);
        Ok(self.repo.count(&query)?)
    }

    /// Counts an employee's absences per type over all years.
    pub fn count_by_type_for_employee(
        &self,
        employee_id: EmployeeId,
    ) -> ServiceResult<Vec<AbsenceTypeCount>> {
        validate_id("employee_id", employee_id)?;
        self.count_by_type(&AbsenceDayListQuery::for_employee(employee_id))
    }

    /// Counts an employee's absences per type within one year.
    pub fn count_by_type_for_employee_and_year(
        &self,
        employee_id: EmployeeId,
        year: i32,
    ) -> ServiceResult<Vec<AbsenceTypeCount>> {
        validate_id("employee_id", employee_id)?;
        let (first, last) = year_bounds(year)?;
        self.count_by_type(&AbsenceDayListQuery::for_employee(employee_id).between(first, last))
    }

    /// Dispatches to exactly one query dimension.
    ///
    /// See `AbsenceDayFilter::resolve` for the precedence order.
    pub fn filter(&self, criteria: &AbsenceDayFilter) -> ServiceResult<Vec<AbsenceDay>> {
        let query = criteria.resolve()?;
        debug!("event=absence_filter module=absence status=start query={query:?}");
        match query {
            AbsenceQuery::DateRange {
                employee_id,
                start,
                end,
            } => self.get_by_employee_id_and_date_range(employee_id, start, end),
            AbsenceQuery::Year { employee_id, year } => {
                self.get_by_employee_id_and_year(employee_id, year)
            }
            AbsenceQuery::AbsenceType {
                employee_id,
                absence_type_id,
            } => self.get_by_employee_id_and_absence_type_id(employee_id, absence_type_id),
            AbsenceQuery::Employee { employee_id } => self.get_by_employee_id(employee_id),
        }
    }

    fn count_by_type(&self, query: &AbsenceDayListQuery) -> ServiceResult<Vec<AbsenceTypeCount>> {
        let mut rows: BTreeMap<AbsenceTypeId, AbsenceTypeCount> = self
            .absence_types
            .list_absence_types()?
            .into_iter()
            .map(|absence_type| {
                (
                    absence_type.id,
                    AbsenceTypeCount {
                        absence_type_id: absence_type.id,
                        absence_type_name: Some(absence_type.name),
                        absence_type_label: absence_type.label,
                        count: 0,
                    },
                )
            })
            .collect();

        for (absence_type_id, count) in self.repo.count_by_type(query)? {
            rows.entry(absence_type_id)
                .or_insert_with(|| AbsenceTypeCount {
                    absence_type_id,
                    absence_type_name: None,
                    absence_type_label: None,
                    count: 0,
                })
                .count = count;
        }

        Ok(rows.into_values().collect())
    }

    /// Required fields, references, then the holiday rule, in that order.
    fn validate_new(&self, request: &AbsenceDayRequest) -> ServiceResult<NewAbsenceDay> {
        let draft = request.require_complete()?;
        self.resolve_employee(draft.employee_id)?;
        self.resolve_absence_type(draft.absence_type_id)?;
        self.ensure_not_holiday(draft.absence_date)?;
        Ok(draft)
    }

    fn resolve_employee(&self, employee_id: EmployeeId) -> ServiceResult<Employee> {
        validate_id("employee_id", employee_id)?;
        self.employees
            .find_employee(employee_id)?
            .ok_or(AbsenceServiceError::EmployeeNotFound(employee_id))
    }

    fn resolve_absence_type(&self, absence_type_id: AbsenceTypeId) -> ServiceResult<AbsenceType> {
        validate_id("absence_type_id", absence_type_id)?;
        self.absence_types
            .find_absence_type(absence_type_id)?
            .ok_or(AbsenceServiceError::AbsenceTypeNotFound(absence_type_id))
    }

    fn ensure_not_holiday(&self, date: NaiveDate) -> ServiceResult<()> {
        if !self.holidays.holiday_exists_on(date)? {
            return Ok(());
        }
        let name = self
            .holidays
            .find_holiday_by_date(date)?
            .map(|holiday| holiday.name)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| GENERIC_HOLIDAY_LABEL.to_string());
        Err(AbsenceValidationError::PublicHoliday { date, name }.into())
    }

    fn ensure_not_persisted(
        &self,
        employee_id: EmployeeId,
        absence_date: NaiveDate,
        exclude_id: Option<AbsenceDayId>,
    ) -> ServiceResult<()> {
        if self
            .repo
            .exists_by_employee_and_date(employee_id, absence_date, exclude_id)?
        {
            return Err(AbsenceServiceError::Duplicate {
                employee_id,
                absence_date,
            });
        }
        Ok(())
    }
}
