//! Shared campus fixture for workflow integration tests.
#![allow(dead_code)]

use chrono::{NaiveTime, TimeZone, Utc, Weekday};
use enrollment_core::model::catalog::{CourseId, RoomId};
use enrollment_core::{
    open_db, open_db_in_memory, AdvisorService, CatalogService, EnrollmentError, ErrorKind,
    FixedClock, NewSection, NewUser, Principal, Role, SectionId, SectionService,
    SqliteCatalogRepository, SqliteEnrollmentRepository, SqliteSectionRepository, StudentService,
    Term, UserId,
};
use rusqlite::Connection;
use std::path::Path;

pub type Students<'a> = StudentService<SqliteEnrollmentRepository<'a>, &'a FixedClock>;
pub type Advisors<'a> = AdvisorService<SqliteEnrollmentRepository<'a>, &'a FixedClock>;

/// Campus with one admin, two lecturers and one advised student.
///
/// The clock starts on 2026-03-10, inside the odd term.
pub struct Campus {
    pub conn: Connection,
    pub clock: FixedClock,
    pub admin: Principal,
    pub advisor: Principal,
    pub other_lecturer: Principal,
    pub student: Principal,
    pub room_a: RoomId,
    pub room_b: RoomId,
}

impl Campus {
    pub fn new() -> Self {
        Self::with_connection(open_db_in_memory().unwrap())
    }

    /// Same campus in a database file, so other connections can share it.
    pub fn on_disk(path: &Path) -> Self {
        Self::with_connection(open_db(path).unwrap())
    }

    fn with_connection(conn: Connection) -> Self {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap());
        let admin = Principal::admin(uuid::Uuid::new_v4());

        let (advisor_id, other_id, student_id, room_a, room_b) = {
            let catalog = CatalogService::new(SqliteCatalogRepository::new(&conn));
            let advisor = catalog
                .create_user(&admin, lecturer("Dr. Advisor", "advisor@campus.test"))
                .unwrap();
            let other = catalog
                .create_user(&admin, lecturer("Dr. Other", "other@campus.test"))
                .unwrap();
            let student = catalog
                .create_user(
                    &admin,
                    NewUser {
                        name: "Student One".to_string(),
                        email: "student.one@campus.test".to_string(),
                        role: Role::Student,
                        student_number: Some("2301001".to_string()),
                        advisor_id: Some(advisor.id),
                    },
                )
                .unwrap();
            let room_a = catalog.create_room(&admin, "Room A").unwrap();
            let room_b = catalog.create_room(&admin, "Room B").unwrap();
            (advisor.id, other.id, student.id, room_a.id, room_b.id)
        };

        Self {
            conn,
            clock,
            admin,
            advisor: Principal::lecturer(advisor_id),
            other_lecturer: Principal::lecturer(other_id),
            student: Principal::student(student_id),
            room_a,
            room_b,
        }
    }

    pub fn catalog(&self) -> CatalogService<SqliteCatalogRepository<'_>> {
        CatalogService::new(SqliteCatalogRepository::new(&self.conn))
    }

    pub fn sections(&self) -> SectionService<SqliteSectionRepository<'_>> {
        SectionService::new(SqliteSectionRepository::new(&self.conn))
    }

    pub fn students(&self) -> Students<'_> {
        StudentService::new(SqliteEnrollmentRepository::new(&self.conn), &self.clock)
    }

    pub fn advisors(&self) -> Advisors<'_> {
        AdvisorService::new(SqliteEnrollmentRepository::new(&self.conn), &self.clock)
    }

    /// Registers another student advised by `advisor`.
    pub fn add_student(&self, email: &str, advisor: Option<UserId>) -> Principal {
        let student = self
            .catalog()
            .create_user(
                &self.admin,
                NewUser {
                    name: "Another Student".to_string(),
                    email: email.to_string(),
                    role: Role::Student,
                    student_number: None,
                    advisor_id: advisor,
                },
            )
            .unwrap();
        Principal::student(student.id)
    }

    pub fn course(&self, code: &str) -> CourseId {
        self.catalog()
            .create_course(&self.admin, code, &format!("Course {code}"), 3)
            .unwrap()
            .id
    }

    pub fn new_section(
        &self,
        course_id: CourseId,
        room_id: RoomId,
        weekday: Weekday,
        start: (u32, u32),
        end: (u32, u32),
        term: Term,
    ) -> NewSection {
        NewSection {
            course_id,
            instructor_id: self.other_lecturer.id,
            room_id,
            label: "A".to_string(),
            weekday,
            start: hm(start.0, start.1),
            end: hm(end.0, end.1),
            capacity: 40,
            term,
        }
    }

    /// Creates an odd-term section in room A.
    pub fn section(
        &self,
        course_id: CourseId,
        weekday: Weekday,
        start: (u32, u32),
        end: (u32, u32),
    ) -> SectionId {
        self.section_in(course_id, self.room_a, weekday, start, end)
    }

    pub fn section_in(
        &self,
        course_id: CourseId,
        room_id: RoomId,
        weekday: Weekday,
        start: (u32, u32),
        end: (u32, u32),
    ) -> SectionId {
        let input = self.new_section(course_id, room_id, weekday, start, end, Term::Odd);
        self.sections()
            .create_section(&self.admin, input)
            .unwrap()
            .id()
    }
}

pub fn lecturer(name: &str, email: &str) -> NewUser {
    NewUser {
        name: name.to_string(),
        email: email.to_string(),
        role: Role::Lecturer,
        student_number: None,
        advisor_id: None,
    }
}

pub fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

pub fn kind_of<T: std::fmt::Debug>(result: Result<T, EnrollmentError>) -> ErrorKind {
    result.unwrap_err().kind()
}
