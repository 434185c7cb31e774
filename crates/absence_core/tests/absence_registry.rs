use absence_core::db::open_db_in_memory;
use absence_core::{
    sqlite_registry, AbsenceDayFilter, AbsenceDayRequest, AbsenceServiceError,
    AbsenceValidationError, ErrorKind, SqliteReferenceStore,
};
use chrono::NaiveDate;
use rusqlite::{params, Connection};

const SICK: i64 = 1;
const VACATION: i64 = 2;
const TRAINING: i64 = 5;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Employees 3, 7 and 8; types 1, 2 and 5; Christmas 2024 as holiday.
fn seeded_conn() -> Connection {
    let conn = open_db_in_memory().unwrap();
    let employees = [(3, "Ada", "Lovelace"), (7, "Alan", "Turing"), (8, "Grace", "Hopper")];
    for (id, first, last) in employees {
        conn.execute(
            "INSERT INTO employees (id, first_name, last_name) VALUES (?1, ?2, ?3);",
            params![id, first, last],
        )
        .unwrap();
    }
    let absence_types = [
        (SICK, "SICK", "Sick leave"),
        (VACATION, "VACATION", "Vacation"),
        (TRAINING, "TRAINING", "Training"),
    ];
    for (id, name, label) in absence_types {
        conn.execute(
            "INSERT INTO absence_types (id, name, label, hours, is_holiday, share_of_day)
             VALUES (?1, ?2, ?3, 8, 0, 1.0);",
            params![id, name, label],
        )
        .unwrap();
    }
    SqliteReferenceStore::try_new(&conn)
        .unwrap()
        .insert_public_holiday(date(2024, 12, 25), "Christmas", true)
        .unwrap();
    conn
}

fn row_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM absence_days;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn create_assigns_id_and_persists_record() {
    let conn = seeded_conn();
    let registry = sqlite_registry(&conn).unwrap();

    let created = registry
        .create(&AbsenceDayRequest::new(date(2024, 3, 1), 7, VACATION))
        .unwrap();

    assert!(created.id > 0);
    assert_eq!(created.employee_id, 7);
    assert_eq!(created.absence_type_id, VACATION);
    assert_eq!(registry.find_by_id(created.id).unwrap(), Some(created));
}

#[test]
fn second_absence_on_same_day_is_duplicate_regardless_of_type() {
    let conn = seeded_conn();
    let registry = sqlite_registry(&conn).unwrap();

    registry
        .create(&AbsenceDayRequest::new(date(2024, 3, 1), 7, VACATION))
        .unwrap();
    let err = registry
        .create(&AbsenceDayRequest::new(date(2024, 3, 1), 7, TRAINING))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Duplicate);
    assert!(err.to_string().contains("2024-03-01"));
    assert_eq!(row_count(&conn), 1);

    registry
        .create(&AbsenceDayRequest::new(date(2024, 3, 1), 8, VACATION))
        .unwrap();
    registry
        .create(&AbsenceDayRequest::new(date(2024, 3, 2), 7, VACATION))
        .unwrap();
    assert_eq!(row_count(&conn), 3);
}

#[test]
fn create_on_public_holiday_names_the_holiday() {
    let conn = seeded_conn();
    let registry = sqlite_registry(&conn).unwrap();

    for employee_id in [3, 7] {
        let err = registry
            .create(&AbsenceDayRequest::new(date(2024, 12, 25), employee_id, SICK))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let message = err.to_string();
        assert!(message.contains("2024-12-25"), "{message}");
        assert!(message.contains("Christmas"), "{message}");
    }
    assert_eq!(row_count(&conn), 0);
}

#[test]
fn holiday_without_name_uses_generic_label() {
    let conn = seeded_conn();
    SqliteReferenceStore::try_new(&conn)
        .unwrap()
        .insert_public_holiday(date(2024, 5, 1), "  ", true)
        .unwrap();
    let registry = sqlite_registry(&conn).unwrap();

    let err = registry
        .create(&AbsenceDayRequest::new(date(2024, 5, 1), 7, SICK))
        .unwrap_err();
    match err {
        AbsenceServiceError::Validation(AbsenceValidationError::PublicHoliday {
            date: day,
            name,
        }) => {
            assert_eq!(day, date(2024, 5, 1));
            assert_eq!(name, "public holiday");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn create_reports_missing_fields_in_order() {
    let conn = seeded_conn();
    let registry = sqlite_registry(&conn).unwrap();

    let empty = AbsenceDayRequest::default();
    assert!(matches!(
        registry.create(&empty).unwrap_err(),
        AbsenceServiceError::Validation(AbsenceValidationError::MissingAbsenceDate)
    ));

    let without_employee = AbsenceDayRequest {
        absence_date: Some(date(2024, 3, 1)),
        ..AbsenceDayRequest::default()
    };
    assert!(matches!(
        registry.create(&without_employee).unwrap_err(),
        AbsenceServiceError::Validation(AbsenceValidationError::MissingEmployee)
    ));

    let without_type = AbsenceDayRequest {
        employee_id: Some(7),
        ..without_employee
    };
    assert!(matches!(
        registry.create(&without_type).unwrap_err(),
        AbsenceServiceError::Validation(AbsenceValidationError::MissingAbsenceType)
    ));

    let bad_id = AbsenceDayRequest::new(date(2024, 3, 1), 0, SICK);
    assert_eq!(registry.create(&bad_id).unwrap_err().kind(), ErrorKind::Validation);
}

#[test]
fn create_with_unknown_references_is_not_found() {
    let conn = seeded_conn();
    let registry = sqlite_registry(&conn).unwrap();

    let err = registry
        .create(&AbsenceDayRequest::new(date(2024, 3, 1), 42, SICK))
        .unwrap_err();
    assert!(matches!(err, AbsenceServiceError::EmployeeNotFound(42)));

    let err = registry
        .create(&AbsenceDayRequest::new(date(2024, 3, 1), 7, 99))
        .unwrap_err();
    assert!(matches!(err, AbsenceServiceError::AbsenceTypeNotFound(99)));
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // References are resolved before the holiday rule.
    let err = registry
        .create(&AbsenceDayRequest::new(date(2024, 12, 25), 42, SICK))
        .unwrap_err();
    assert!(matches!(err, AbsenceServiceError::EmployeeNotFound(42)));
}

#[test]
fn find_by_id_handles_missing_and_invalid_ids() {
    let conn = seeded_conn();
    let registry = sqlite_registry(&conn).unwrap();

    assert_eq!(registry.find_by_id(12345).unwrap(), None);
    assert_eq!(registry.find_by_id(0).unwrap_err().kind(), ErrorKind::Validation);
}

#[test]
fn find_with_references_resolves_employee_and_type() {
    let conn = seeded_conn();
    let registry = sqlite_registry(&conn).unwrap();
    let created = registry
        .create(&AbsenceDayRequest::new(date(2024, 3, 1), 7, VACATION))
        .unwrap();

    let details = registry.find_with_references(created.id).unwrap().unwrap();
    assert_eq!(details.absence_day, created);
    assert_eq!(details.employee.unwrap().full_name(), "Alan Turing");
    assert_eq!(details.absence_type.unwrap().name, "VACATION");

    assert!(registry.find_with_references(999).unwrap().is_none());
}

#[test]
fn find_all_orders_by_date_and_accepts_custom_order() {
    let conn = seeded_conn();
    let registry = sqlite_registry(&conn).unwrap();

    let later = registry
        .create(&AbsenceDayRequest::new(date(2024, 6, 1), 3, SICK))
        .unwrap();
    let earlier = registry
        .create(&AbsenceDayRequest::new(date(2024, 2, 1), 8, SICK))
        .unwrap();

    let ids: Vec<_> = registry.find_all().unwrap().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![earlier.id, later.id]);

    let by_employee_desc: Vec<_> = registry
        .find_all_sorted_by(|a, b| b.employee_id.cmp(&a.employee_id))
        .unwrap()
        .iter()
        .map(|r| r.employee_id)
        .collect();
    assert_eq!(by_employee_desc, vec![8, 3]);
}

#[test]
fn update_to_own_slot_with_new_type_succeeds() {
    let conn = seeded_conn();
    let registry = sqlite_registry(&conn).unwrap();
    let created = registry
        .create(&AbsenceDayRequest::new(date(2024, 3, 1), 7, VACATION))
        .unwrap();

    let updated = registry
        .update(
            created.id,
            &AbsenceDayRequest::new(date(2024, 3, 1), 7, TRAINING),
        )
        .unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.absence_type_id, TRAINING);
    assert_eq!(registry.find_by_id(created.id).unwrap(), Some(updated));
}

#[test]
fn type_only_update_skips_holiday_rule() {
    let conn = seeded_conn();
    let registry = sqlite_registry(&conn).unwrap();
    let created = registry
        .create(&AbsenceDayRequest::new(date(2024, 11, 1), 7, VACATION))
        .unwrap();

    // The date becomes a holiday after the record was registered.
    SqliteReferenceStore::try_new(&conn)
        .unwrap()
        .insert_public_holiday(date(2024, 11, 1), "All Saints' Day", true)
        .unwrap();

    let updated = registry
        .update(
            created.id,
            &AbsenceDayRequest {
                absence_type_id: Some(SICK),
                ..AbsenceDayRequest::default()
            },
        )
        .unwrap();
    assert_eq!(updated.absence_type_id, SICK);
    assert_eq!(updated.absence_date, date(2024, 11, 1));
}

#[test]
fn update_rechecks_rules_when_date_or_employee_changes() {
    let conn = seeded_conn();
    let registry = sqlite_registry(&conn).unwrap();
    let first = registry
        .create(&AbsenceDayRequest::new(date(2024, 3, 1), 7, VACATION))
        .unwrap();
    let second = registry
        .create(&AbsenceDayRequest::new(date(2024, 3, 2), 7, VACATION))
        .unwrap();
    registry
        .create(&AbsenceDayRequest::new(date(2024, 3, 5), 8, VACATION))
        .unwrap();

    let to_holiday = AbsenceDayRequest {
        absence_date: Some(date(2024, 12, 25)),
        ..AbsenceDayRequest::default()
    };
    let err = registry.update(second.id, &to_holiday).unwrap_err();
    assert!(err.to_string().contains("Christmas"));

    let onto_first = AbsenceDayRequest {
        absence_date: Some(first.absence_date),
        ..AbsenceDayRequest::default()
    };
    let err = registry.update(second.id, &onto_first).unwrap_err();
    assert!(matches!(err, AbsenceServiceError::Duplicate { employee_id: 7, .. }));

    let to_other_employee = AbsenceDayRequest {
        absence_date: Some(date(2024, 3, 5)),
        employee_id: Some(8),
        ..AbsenceDayRequest::default()
    };
    let err = registry.update(second.id, &to_other_employee).unwrap_err();
    assert!(matches!(err, AbsenceServiceError::Duplicate { employee_id: 8, .. }));

    assert_eq!(registry.find_by_id(second.id).unwrap(), Some(second.clone()));

    let moved = registry
        .update(
            second.id,
            &AbsenceDayRequest {
                employee_id: Some(3),
                ..AbsenceDayRequest::default()
            },
        )
        .unwrap();
    assert_eq!(moved.employee_id, 3);
    assert_eq!(moved.absence_date, second.absence_date);
    assert_eq!(moved.absence_type_id, VACATION);
}

#[test]
fn update_reports_missing_record_and_references() {
    let conn = seeded_conn();
    let registry = sqlite_registry(&conn).unwrap();
    let created = registry
        .create(&AbsenceDayRequest::new(date(2024, 3, 1), 7, VACATION))
        .unwrap();

    let err = registry
        .update(999, &AbsenceDayRequest::new(date(2024, 3, 1), 7, SICK))
        .unwrap_err();
    assert!(matches!(err, AbsenceServiceError::AbsenceDayNotFound(999)));

    let err = registry
        .update(
            created.id,
            &AbsenceDayRequest {
                employee_id: Some(42),
                ..AbsenceDayRequest::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, AbsenceServiceError::EmployeeNotFound(42)));

    let err = registry
        .update(
            created.id,
            &AbsenceDayRequest {
                absence_type_id: Some(99),
                ..AbsenceDayRequest::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, AbsenceServiceError::AbsenceTypeNotFound(99)));

    let err = registry
        .update(-1, &AbsenceDayRequest::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn delete_removes_record_once() {
    let conn = seeded_conn();
    let registry = sqlite_registry(&conn).unwrap();
    let created = registry
        .create(&AbsenceDayRequest::new(date(2024, 3, 1), 7, VACATION))
        .unwrap();

    registry.delete(created.id).unwrap();
    assert_eq!(registry.find_by_id(created.id).unwrap(), None);

    let err = registry.delete(created.id).unwrap_err();
    assert!(matches!(err, AbsenceServiceError::AbsenceDayNotFound(id) if id == created.id));
    assert_eq!(registry.delete(0).unwrap_err().kind(), ErrorKind::Validation);
}

#[test]
fn date_range_query_is_inclusive_and_rejects_inverted_range() {
    let conn = seeded_conn();
    let registry = sqlite_registry(&conn).unwrap();
    for day in [1, 15, 31] {
        registry
            .create(&AbsenceDayRequest::new(date(2024, 1, day), 7, SICK))
            .unwrap();
    }
    registry
        .create(&AbsenceDayRequest::new(date(2024, 2, 1), 7, SICK))
        .unwrap();

    let january = registry
        .get_by_employee_id_and_date_range(7, date(2024, 1, 1), date(2024, 1, 31))
        .unwrap();
    assert_eq!(january.len(), 3);
    assert!(january.iter().all(|r| r.absence_date.format("%m").to_string() == "01"));

    let single_day = registry
        .get_by_employee_id_and_date_range(7, date(2024, 1, 15), date(2024, 1, 15))
        .unwrap();
    assert_eq!(single_day.len(), 1);

    let err = registry
        .get_by_employee_id_and_date_range(7, date(2024, 1, 31), date(2024, 1, 1))
        .unwrap_err();
    assert!(matches!(
        err,
        AbsenceServiceError::Validation(AbsenceValidationError::InvalidDateRange { .. })
    ));
}

#[test]
fn per_employee_queries_filter_by_year_and_type() {
    let conn = seeded_conn();
    let registry = sqlite_registry(&conn).unwrap();
    registry
        .create(&AbsenceDayRequest::new(date(2023, 12, 31), 7, SICK))
        .unwrap();
    registry
        .create(&AbsenceDayRequest::new(date(2024, 1, 1), 7, SICK))
        .unwrap();
    registry
        .create(&AbsenceDayRequest::new(date(2024, 7, 1), 7, VACATION))
        .unwrap();
    registry
        .create(&AbsenceDayRequest::new(date(2024, 7, 1), 8, SICK))
        .unwrap();

    assert_eq!(registry.get_by_employee_id(7).unwrap().len(), 3);
    assert_eq!(registry.get_by_employee_id(3).unwrap(), vec![]);
    assert_eq!(registry.get_by_employee_id_and_year(7, 2024).unwrap().len(), 2);
    assert_eq!(registry.get_by_employee_id_and_year(7, 2023).unwrap().len(), 1);
    assert_eq!(
        registry
            .get_by_employee_id_and_absence_type_id(7, SICK)
            .unwrap()
            .len(),
        2
    );
    assert!(registry
        .exists_by_employee_id_and_absence_date(7, date(2024, 7, 1))
        .unwrap());
    assert!(!registry
        .exists_by_employee_id_and_absence_date(3, date(2024, 7, 1))
        .unwrap());
    assert_eq!(
        registry.get_by_employee_id_and_year(7, 0).unwrap_err().kind(),
        ErrorKind::Validation
    );
}

#[test]
fn yearly_type_count_returns_zero_when_nothing_matches() {
    let conn = seeded_conn();
    let registry = sqlite_registry(&conn).unwrap();
    registry
        .create(&AbsenceDayRequest::new(date(2024, 1, 2), 7, SICK))
        .unwrap();
    registry
        .create(&AbsenceDayRequest::new(date(2024, 1, 3), 7, SICK))
        .unwrap();
    registry
        .create(&AbsenceDayRequest::new(date(2023, 1, 3), 7, SICK))
        .unwrap();

    assert_eq!(
        registry
            .count_by_employee_id_and_absence_type_id_and_year(7, SICK, 2024)
            .unwrap(),
        2
    );
    assert_eq!(
        registry
            .count_by_employee_id_and_absence_type_id_and_year(99, SICK, 2024)
            .unwrap(),
        0
    );
}

#[test]
fn grouped_counts_list_every_type_including_zero() {
    let conn = seeded_conn();
    let registry = sqlite_registry(&conn).unwrap();
    registry
        .create(&AbsenceDayRequest::new(date(2024, 1, 2), 7, SICK))
        .unwrap();
    registry
        .create(&AbsenceDayRequest::new(date(2024, 1, 3), 7, SICK))
        .unwrap();
    registry
        .create(&AbsenceDayRequest::new(date(2023, 5, 3), 7, TRAINING))
        .unwrap();

    let all_years: Vec<_> = registry
        .count_by_type_for_employee(7)
        .unwrap()
        .into_iter()
        .map(|row| (row.absence_type_id, row.count))
        .collect();
    assert_eq!(all_years, vec![(SICK, 2), (VACATION, 0), (TRAINING, 1)]);

    let year_2024 = registry.count_by_type_for_employee_and_year(7, 2024).unwrap();
    let counts: Vec<_> = year_2024.iter().map(|row| (row.absence_type_id, row.count)).collect();
    assert_eq!(counts, vec![(SICK, 2), (VACATION, 0), (TRAINING, 0)]);
    assert_eq!(year_2024[0].absence_type_name.as_deref(), Some("SICK"));
    assert_eq!(year_2024[0].absence_type_label.as_deref(), Some("Sick leave"));
}

#[test]
fn filter_prefers_year_over_absence_type() {
    let conn = seeded_conn();
    let registry = sqlite_registry(&conn).unwrap();
    registry
        .create(&AbsenceDayRequest::new(date(2023, 4, 1), 7, VACATION))
        .unwrap();
    let first_2024 = registry
        .create(&AbsenceDayRequest::new(date(2024, 4, 1), 7, VACATION))
        .unwrap();
    let second_2024 = registry
        .create(&AbsenceDayRequest::new(date(2024, 4, 2), 7, TRAINING))
        .unwrap();

    let filtered = registry
        .filter(&AbsenceDayFilter {
            employee_id: Some(7),
            year: Some(2024),
            absence_type_id: Some(VACATION),
            ..AbsenceDayFilter::default()
        })
        .unwrap();
    assert_eq!(filtered, vec![first_2024, second_2024]);
}

#[test]
fn filter_dispatches_by_available_criteria() {
    let conn = seeded_conn();
    let registry = sqlite_registry(&conn).unwrap();
    registry
        .create(&AbsenceDayRequest::new(date(2023, 4, 1), 7, VACATION))
        .unwrap();
    registry
        .create(&AbsenceDayRequest::new(date(2024, 4, 1), 7, SICK))
        .unwrap();

    let range = registry
        .filter(&AbsenceDayFilter {
            employee_id: Some(7),
            start_date: Some(date(2023, 1, 1)),
            end_date: Some(date(2023, 12, 31)),
            year: Some(2024),
            ..AbsenceDayFilter::default()
        })
        .unwrap();
    assert_eq!(range.len(), 1);
    assert_eq!(range[0].absence_date, date(2023, 4, 1));

    // A half-open range falls through to the next criterion.
    let by_type = registry
        .filter(&AbsenceDayFilter {
            employee_id: Some(7),
            start_date: Some(date(2023, 1, 1)),
            absence_type_id: Some(SICK),
            ..AbsenceDayFilter::default()
        })
        .unwrap();
    assert_eq!(by_type.len(), 1);
    assert_eq!(by_type[0].absence_type_id, SICK);

    let everything = registry
        .filter(&AbsenceDayFilter {
            employee_id: Some(7),
            ..AbsenceDayFilter::default()
        })
        .unwrap();
    assert_eq!(everything.len(), 2);

    let err = registry.filter(&AbsenceDayFilter::default()).unwrap_err();
    assert!(matches!(
        err,
        AbsenceServiceError::Validation(AbsenceValidationError::MissingEmployee)
    ));
}

#[test]
fn bulk_create_returns_records_in_input_order() {
    let conn = seeded_conn();
    let registry = sqlite_registry(&conn).unwrap();

    let created = registry
        .create_bulk(&[
            AbsenceDayRequest::new(date(2024, 8, 5), 7, VACATION),
            AbsenceDayRequest::new(date(2024, 8, 1), 7, VACATION),
            AbsenceDayRequest::new(date(2024, 8, 1), 8, SICK),
        ])
        .unwrap();

    let slots: Vec<_> = created.iter().map(|r| (r.employee_id, r.absence_date)).collect();
    assert_eq!(
        slots,
        vec![(7, date(2024, 8, 5)), (7, date(2024, 8, 1)), (8, date(2024, 8, 1))]
    );
    assert!(created.iter().all(|r| r.id > 0));
    assert_eq!(row_count(&conn), 3);
}

#[test]
fn bulk_create_is_all_or_nothing() {
    let conn = seeded_conn();
    let registry = sqlite_registry(&conn).unwrap();
    registry
        .create(&AbsenceDayRequest::new(date(2024, 1, 10), 3, SICK))
        .unwrap();
    let before = row_count(&conn);

    let err = registry
        .create_bulk(&[
            AbsenceDayRequest::new(date(2024, 12, 23), 7, VACATION),
            AbsenceDayRequest::new(date(2024, 12, 25), 7, VACATION),
            AbsenceDayRequest::new(date(2024, 12, 27), 7, VACATION),
        ])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(row_count(&conn), before);

    let err = registry
        .create_bulk(&[
            AbsenceDayRequest::new(date(2024, 2, 1), 7, VACATION),
            AbsenceDayRequest::new(date(2024, 2, 2), 7, 99),
        ])
        .unwrap_err();
    assert!(matches!(err, AbsenceServiceError::AbsenceTypeNotFound(99)));
    assert_eq!(row_count(&conn), before);

    let err = registry
        .create_bulk(&[
            AbsenceDayRequest::new(date(2024, 2, 1), 7, VACATION),
            AbsenceDayRequest::new(date(2024, 1, 10), 3, VACATION),
        ])
        .unwrap_err();
    assert!(matches!(err, AbsenceServiceError::Duplicate { employee_id: 3, .. }));
    assert_eq!(row_count(&conn), before);
}

#[test]
fn bulk_create_rejects_duplicates_within_batch() {
    let conn = seeded_conn();
    let registry = sqlite_registry(&conn).unwrap();

    let err = registry
        .create_bulk(&[
            AbsenceDayRequest::new(date(2024, 3, 1), 7, VACATION),
            AbsenceDayRequest::new(date(2024, 3, 1), 7, SICK),
        ])
        .unwrap_err();
    assert!(matches!(err, AbsenceServiceError::Duplicate { employee_id: 7, .. }));
    assert_eq!(row_count(&conn), 0);
}

#[test]
fn bulk_create_rejects_empty_batch() {
    let conn = seeded_conn();
    let registry = sqlite_registry(&conn).unwrap();

    let err = registry.create_bulk(&[]).unwrap_err();
    assert!(matches!(
        err,
        AbsenceServiceError::Validation(AbsenceValidationError::EmptyBatch)
    ));
}
