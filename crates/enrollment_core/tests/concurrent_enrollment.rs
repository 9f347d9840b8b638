mod common;

use chrono::Weekday;
use common::Campus;
use enrollment_core::repo::enrollment_repo::EnrollmentRepository;
use enrollment_core::service::rules::RuleViolation;
use enrollment_core::service::student_service::admit_enrollment;
use enrollment_core::{
    open_db, AdvisorService, Clock, EnrollmentError, ErrorKind, RecordStatus,
    SqliteEnrollmentRepository, Term,
};

#[test]
fn enroll_sees_a_verification_committed_by_another_connection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("campus.sqlite3");
    let campus = Campus::on_disk(&path);
    let reviewed = campus.section(campus.course("CS103"), Weekday::Tue, (8, 0), (10, 0));
    let late = campus.section(campus.course("CS101"), Weekday::Mon, (8, 0), (10, 0));
    campus.students().enroll(&campus.student, &[reviewed]).unwrap();

    let repo = SqliteEnrollmentRepository::new(&campus.conn);
    let snapshot = repo
        .find_record(campus.student.id, Term::Odd)
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.status, RecordStatus::Draft);

    let advisor_conn = open_db(&path).unwrap();
    AdvisorService::new(SqliteEnrollmentRepository::new(&advisor_conn), &campus.clock)
        .approve(&campus.advisor, campus.student.id, reviewed)
        .unwrap();

    let err = repo
        .insert_items(
            snapshot.id,
            &[late],
            campus.clock.now_epoch_ms(),
            admit_enrollment,
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);

    let record = campus.students().taken(&campus.student).unwrap();
    assert_eq!(record.status, RecordStatus::Verified);
    assert_eq!(record.items.len(), 1);
    assert!(record.item_for_section(late).is_none());
}

#[test]
fn enroll_sees_items_inserted_by_another_connection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("campus.sqlite3");
    let campus = Campus::on_disk(&path);
    let morning = campus.section(campus.course("CS101"), Weekday::Mon, (8, 0), (10, 0));
    let clash =
        campus.section_in(campus.course("CS102"), campus.room_b, Weekday::Mon, (9, 0), (11, 0));

    let other_conn = open_db(&path).unwrap();
    let other_repo = SqliteEnrollmentRepository::new(&other_conn);
    let snapshot = other_repo
        .get_or_create_record(campus.student.id, Term::Odd, campus.clock.now_epoch_ms())
        .unwrap();
    assert!(snapshot.items.is_empty());

    campus.students().enroll(&campus.student, &[morning]).unwrap();

    let err = other_repo
        .insert_items(
            snapshot.id,
            &[clash],
            campus.clock.now_epoch_ms(),
            admit_enrollment,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        EnrollmentError::Rule(RuleViolation::ScheduleOverlap { .. })
    ));

    let record = campus.students().taken(&campus.student).unwrap();
    assert_eq!(record.items.len(), 1);
    assert!(record.holds_live_section(morning));
    assert!(record.item_for_section(clash).is_none());
}

#[test]
fn rejected_check_writes_nothing() {
    let campus = Campus::new();
    let section = campus.section(campus.course("CS101"), Weekday::Mon, (8, 0), (10, 0));
    let repo = SqliteEnrollmentRepository::new(&campus.conn);
    let record = repo
        .get_or_create_record(campus.student.id, Term::Odd, campus.clock.now_epoch_ms())
        .unwrap();

    let err = repo
        .insert_items(record.id, &[section], 0, |_, _| {
            Err::<(), EnrollmentError>(EnrollmentError::EmptyRequest)
        })
        .unwrap_err();
    assert!(matches!(err, EnrollmentError::EmptyRequest));

    let reloaded = repo.find_record(campus.student.id, Term::Odd).unwrap().unwrap();
    assert!(reloaded.items.is_empty());
}
