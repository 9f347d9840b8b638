mod common;

use chrono::Weekday;
use common::{kind_of, Campus};
use enrollment_core::model::enrollment::EnrollmentRecord;
use enrollment_core::service::rules::RuleViolation;
use enrollment_core::{
    Clock, EnrollmentError, ErrorKind, ItemStatus, RecordStatus, SectionId,
};

/// Campus with the student enrolled in two disjoint sections.
fn enrolled_campus() -> (Campus, SectionId, SectionId) {
    let campus = Campus::new();
    let first = campus.section(campus.course("CS101"), Weekday::Mon, (8, 0), (10, 0));
    let second = campus.section(campus.course("CS102"), Weekday::Tue, (8, 0), (10, 0));
    campus
        .students()
        .enroll(&campus.student, &[first, second])
        .unwrap();
    (campus, first, second)
}

fn status_of(record: &EnrollmentRecord, section_id: SectionId) -> ItemStatus {
    record.item_for_section(section_id).unwrap().status
}

#[test]
fn approve_verifies_the_record() {
    let (campus, first, second) = enrolled_campus();
    let record = campus
        .advisors()
        .approve(&campus.advisor, campus.student.id, first)
        .unwrap();

    assert_eq!(record.status, RecordStatus::Verified);
    assert_eq!(record.verified_at, Some(campus.clock.now_epoch_ms()));
    assert_eq!(status_of(&record, first), ItemStatus::Approved);
    assert_eq!(status_of(&record, second), ItemStatus::Active);
}

#[test]
fn reject_verifies_and_frees_the_slot() {
    let (campus, first, _) = enrolled_campus();
    let advisors = campus.advisors();
    let record = advisors
        .reject(&campus.advisor, campus.student.id, first)
        .unwrap();

    assert_eq!(record.status, RecordStatus::Verified);
    assert_eq!(status_of(&record, first), ItemStatus::Rejected);
    assert!(!record.holds_live_section(first));

    assert_eq!(
        kind_of(advisors.reject(&campus.advisor, campus.student.id, first)),
        ErrorKind::InvalidTransition
    );
}

#[test]
fn approving_a_rejected_item_rechecks_the_schedule() {
    let (campus, first, second) = enrolled_campus();
    let clash = campus.section_in(
        campus.course("CS103"),
        campus.room_b,
        Weekday::Mon,
        (9, 0),
        (11, 0),
    );
    let advisors = campus.advisors();
    advisors
        .reject(&campus.advisor, campus.student.id, first)
        .unwrap();
    advisors
        .reassign_item(&campus.advisor, campus.student.id, second, clash)
        .unwrap();

    let err = advisors
        .approve(&campus.advisor, campus.student.id, first)
        .unwrap_err();
    assert!(matches!(
        err,
        EnrollmentError::Rule(RuleViolation::ScheduleOverlap { .. })
    ));

    let record = advisors.view_record(&campus.advisor, campus.student.id).unwrap();
    assert_eq!(status_of(&record, first), ItemStatus::Rejected);
}

#[test]
fn approving_a_rejected_item_without_clash_succeeds() {
    let (campus, first, _) = enrolled_campus();
    let advisors = campus.advisors();
    advisors
        .reject(&campus.advisor, campus.student.id, first)
        .unwrap();

    let record = advisors
        .approve(&campus.advisor, campus.student.id, first)
        .unwrap();
    assert_eq!(status_of(&record, first), ItemStatus::Approved);
}

#[test]
fn unassigned_lecturer_is_forbidden_everywhere() {
    let (campus, first, second) = enrolled_campus();
    let advisors = campus.advisors();
    let stranger = campus.other_lecturer;
    let student_id = campus.student.id;

    let attempts = [
        kind_of(advisors.view_record(&stranger, student_id)),
        kind_of(advisors.approve(&stranger, student_id, first)),
        kind_of(advisors.reject(&stranger, student_id, first)),
        kind_of(advisors.remove_item(&stranger, student_id, first)),
        kind_of(advisors.reassign_item(&stranger, student_id, first, second)),
        kind_of(advisors.confirm_cancellation(&stranger, student_id, first)),
        kind_of(advisors.annotate(&stranger, student_id, "note")),
    ];
    assert!(attempts.iter().all(|kind| *kind == ErrorKind::Forbidden));

    let record = advisors.view_record(&campus.advisor, student_id).unwrap();
    assert_eq!(record.status, RecordStatus::Draft);
    assert_eq!(record.items.len(), 2);
    assert!(record.advisor_note.is_empty());
}

#[test]
fn students_cannot_call_advisor_operations() {
    let (campus, first, _) = enrolled_campus();
    let advisors = campus.advisors();

    assert_eq!(
        kind_of(advisors.approve(&campus.student, campus.student.id, first)),
        ErrorKind::Forbidden
    );
    assert_eq!(
        kind_of(advisors.list_advisees(&campus.student)),
        ErrorKind::Forbidden
    );
}

#[test]
fn reassign_onto_overlapping_section_keeps_the_original() {
    let (campus, first, second) = enrolled_campus();
    let clash = campus.section_in(
        campus.course("CS103"),
        campus.room_b,
        Weekday::Tue,
        (9, 0),
        (11, 0),
    );
    let advisors = campus.advisors();

    let err = advisors
        .reassign_item(&campus.advisor, campus.student.id, first, clash)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let record = advisors.view_record(&campus.advisor, campus.student.id).unwrap();
    assert!(record.holds_live_section(first));
    assert!(record.holds_live_section(second));
    assert!(record.item_for_section(clash).is_none());
}

#[test]
fn reassign_rejects_duplicate_course_and_held_section() {
    let (campus, first, second) = enrolled_campus();
    let second_course = campus.sections().get_section(second).unwrap().section.course_id;
    let other_cs102 =
        campus.section_in(second_course, campus.room_b, Weekday::Thu, (8, 0), (10, 0));
    let elective = campus.section_in(
        campus.course("CS104"),
        campus.room_b,
        Weekday::Fri,
        (8, 0),
        (10, 0),
    );
    let advisors = campus.advisors();

    let held = advisors
        .reassign_item(&campus.advisor, campus.student.id, first, second)
        .unwrap_err();
    assert!(matches!(
        held,
        EnrollmentError::Rule(RuleViolation::SectionAlreadyHeld { .. })
    ));
    let same_course = advisors
        .reassign_item(&campus.advisor, campus.student.id, first, other_cs102)
        .unwrap_err();
    assert!(matches!(
        same_course,
        EnrollmentError::Rule(RuleViolation::CourseAlreadyHeld { .. })
    ));

    let record = advisors
        .reassign_item(&campus.advisor, campus.student.id, first, elective)
        .unwrap();
    assert!(record.holds_live_section(elective));
    assert!(record.item_for_section(first).is_none());
}

#[test]
fn reassign_resets_status_and_replaces_section() {
    let (campus, first, _) = enrolled_campus();
    let replacement = campus.section_in(
        campus.course("CS105"),
        campus.room_b,
        Weekday::Wed,
        (8, 0),
        (10, 0),
    );
    let advisors = campus.advisors();
    advisors
        .approve(&campus.advisor, campus.student.id, first)
        .unwrap();
    let item_id = advisors
        .view_record(&campus.advisor, campus.student.id)
        .unwrap()
        .item_for_section(first)
        .unwrap()
        .id;

    let record = advisors
        .reassign_item(&campus.advisor, campus.student.id, first, replacement)
        .unwrap();
    let moved = record.item_for_section(replacement).unwrap();
    assert_eq!(moved.id, item_id);
    assert_eq!(moved.status, ItemStatus::Active);
    assert_eq!(moved.section.course_code(), "CS105");
    assert_eq!(record.status, RecordStatus::Verified);
}

#[test]
fn cancellation_flow_ends_in_cancelled() {
    let (campus, first, second) = enrolled_campus();
    let advisors = campus.advisors();
    advisors
        .approve(&campus.advisor, campus.student.id, first)
        .unwrap();
    campus
        .students()
        .request_cancellation(&campus.student, second)
        .unwrap();

    assert_eq!(
        kind_of(advisors.confirm_cancellation(&campus.advisor, campus.student.id, first)),
        ErrorKind::InvalidTransition
    );

    campus.clock.advance_ms(5_000);
    let record = advisors
        .confirm_cancellation(&campus.advisor, campus.student.id, second)
        .unwrap();
    let item = record.item_for_section(second).unwrap();
    assert_eq!(item.status, ItemStatus::Cancelled);
    assert_eq!(item.cancelled_at, Some(campus.clock.now_epoch_ms()));
    assert!(item.cancellation_requested_at.is_some());
    assert_eq!(record.status, RecordStatus::Verified);

    assert_eq!(
        kind_of(advisors.approve(&campus.advisor, campus.student.id, second)),
        ErrorKind::InvalidTransition
    );
    assert_eq!(
        kind_of(advisors.reassign_item(&campus.advisor, campus.student.id, second, first)),
        ErrorKind::InvalidTransition
    );
}

#[test]
fn remove_item_deletes_in_any_status() {
    let (campus, first, second) = enrolled_campus();
    let advisors = campus.advisors();
    advisors
        .approve(&campus.advisor, campus.student.id, first)
        .unwrap();

    let record = advisors
        .remove_item(&campus.advisor, campus.student.id, first)
        .unwrap();
    assert!(record.item_for_section(first).is_none());
    assert!(record.holds_live_section(second));

    assert_eq!(
        kind_of(advisors.remove_item(&campus.advisor, campus.student.id, first)),
        ErrorKind::NotFound
    );
}

#[test]
fn annotate_and_list_advisees() {
    let (campus, _, _) = enrolled_campus();
    let sibling = campus.add_student("sibling@campus.test", Some(campus.advisor.id));
    campus.add_student("orphan@campus.test", None);
    let advisors = campus.advisors();

    let record = advisors
        .annotate(&campus.advisor, campus.student.id, "  Take CS101 first.  ")
        .unwrap();
    assert_eq!(record.advisor_note, "Take CS101 first.");

    let advisees: Vec<_> = advisors
        .list_advisees(&campus.advisor)
        .unwrap()
        .into_iter()
        .map(|user| user.id)
        .collect();
    assert_eq!(advisees.len(), 2);
    assert!(advisees.contains(&campus.student.id));
    assert!(advisees.contains(&sibling.id));
    assert!(advisors
        .list_advisees(&campus.other_lecturer)
        .unwrap()
        .is_empty());
}

#[test]
fn review_of_unknown_section_is_not_found() {
    let (campus, _, _) = enrolled_campus();
    assert_eq!(
        kind_of(
            campus
                .advisors()
                .approve(&campus.advisor, campus.student.id, uuid::Uuid::new_v4())
        ),
        ErrorKind::NotFound
    );
}
