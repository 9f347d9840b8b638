//! Shared SQL fragments and row decoders.

use super::{RepoError, RepoResult};
use crate::clock::Term;
use crate::model::catalog::{Course, Room, UserProfile};
use crate::model::enrollment::{ItemStatus, RecordStatus};
use crate::model::principal::Role;
use crate::model::section::{ClassSection, SectionDetail, TimeWindow};
use chrono::{NaiveTime, Timelike, Weekday};
use rusqlite::{Connection, Row};
use uuid::Uuid;

/// Columns selecting one hydrated section. Pair with `SECTION_JOINS`.
pub(crate) const SECTION_COLUMNS: &str = "
    s.id AS section_id,
    s.course_id AS course_id,
    s.instructor_id AS instructor_id,
    s.room_id AS room_id,
    s.label AS section_label,
    s.weekday AS weekday,
    s.starts_at_sec AS starts_at_sec,
    s.ends_at_sec AS ends_at_sec,
    s.capacity AS capacity,
    s.term AS section_term,
    c.code AS course_code,
    c.name AS course_name,
    c.credits AS course_credits,
    r.name AS room_name,
    u.name AS instructor_name,
    u.email AS instructor_email,
    u.role AS instructor_role,
    u.student_number AS instructor_student_number,
    u.advisor_id AS instructor_advisor_id";

pub(crate) const SECTION_JOINS: &str = "
    INNER JOIN courses c ON c.id = s.course_id
    INNER JOIN rooms r ON r.id = s.room_id
    INNER JOIN users u ON u.id = s.instructor_id";

pub(crate) const USER_COLUMNS: &str = "id, name, email, role, student_number, advisor_id";

/// Column names for one user projection inside a row.
pub(crate) struct UserColumns {
    pub id: &'static str,
    pub name: &'static str,
    pub email: &'static str,
    pub role: &'static str,
    pub student_number: &'static str,
    pub advisor_id: &'static str,
}

pub(crate) const PLAIN_USER: UserColumns = UserColumns {
    id: "id",
    name: "name",
    email: "email",
    role: "role",
    student_number: "student_number",
    advisor_id: "advisor_id",
};

const INSTRUCTOR: UserColumns = UserColumns {
    id: "instructor_id",
    name: "instructor_name",
    email: "instructor_email",
    role: "instructor_role",
    student_number: "instructor_student_number",
    advisor_id: "instructor_advisor_id",
};

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn uuid_col(row: &Row<'_>, column: &'static str) -> RepoResult<Uuid> {
    let text: String = row.get(column)?;
    parse_uuid(&text, column)
}

pub(crate) fn opt_uuid_col(row: &Row<'_>, column: &'static str) -> RepoResult<Option<Uuid>> {
    row.get::<_, Option<String>>(column)?
        .map(|value| parse_uuid(&value, column))
        .transpose()
}

pub(crate) fn term_col(row: &Row<'_>, column: &'static str) -> RepoResult<Term> {
    let text: String = row.get(column)?;
    Term::parse(&text)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid term `{text}` in {column}")))
}

pub(crate) fn item_status_col(row: &Row<'_>, column: &'static str) -> RepoResult<ItemStatus> {
    let text: String = row.get(column)?;
    ItemStatus::parse(&text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid item status `{text}` in {column}"))
    })
}

pub(crate) fn record_status_col(row: &Row<'_>, column: &'static str) -> RepoResult<RecordStatus> {
    let text: String = row.get(column)?;
    RecordStatus::parse(&text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid record status `{text}` in {column}"))
    })
}

pub(crate) fn weekday_to_db(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

fn parse_weekday(value: &str) -> Option<Weekday> {
    match value {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

pub(crate) fn time_to_db(time: NaiveTime) -> i64 {
    i64::from(time.num_seconds_from_midnight())
}

fn time_col(row: &Row<'_>, column: &'static str) -> RepoResult<NaiveTime> {
    let seconds: i64 = row.get(column)?;
    u32::try_from(seconds)
        .ok()
        .and_then(|secs| NaiveTime::from_num_seconds_from_midnight_opt(secs, 0))
        .ok_or_else(|| {
            RepoError::InvalidData(format!("invalid time of day `{seconds}` in {column}"))
        })
}

pub(crate) fn parse_user(row: &Row<'_>, cols: &UserColumns) -> RepoResult<UserProfile> {
    let role_text: String = row.get(cols.role)?;
    let role = Role::parse(&role_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid role `{role_text}` in {}", cols.role))
    })?;
    Ok(UserProfile {
        id: uuid_col(row, cols.id)?,
        name: row.get(cols.name)?,
        email: row.get(cols.email)?,
        role,
        student_number: row.get(cols.student_number)?,
        advisor_id: opt_uuid_col(row, cols.advisor_id)?,
    })
}

pub(crate) fn parse_section_detail(row: &Row<'_>) -> RepoResult<SectionDetail> {
    let weekday_text: String = row.get("weekday")?;
    let weekday = parse_weekday(&weekday_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid weekday `{weekday_text}` in sections.weekday"))
    })?;
    let window = TimeWindow::new(time_col(row, "starts_at_sec")?, time_col(row, "ends_at_sec")?)
        .map_err(|err| RepoError::InvalidData(err.to_string()))?;
    let capacity: i64 = row.get("capacity")?;
    let capacity = u32::try_from(capacity).map_err(|_| {
        RepoError::InvalidData(format!("invalid capacity `{capacity}` in sections.capacity"))
    })?;
    let credits: i64 = row.get("course_credits")?;
    let credits = u32::try_from(credits).map_err(|_| {
        RepoError::InvalidData(format!("invalid credits `{credits}` in courses.credits"))
    })?;

    let section = ClassSection {
        id: uuid_col(row, "section_id")?,
        course_id: uuid_col(row, "course_id")?,
        instructor_id: uuid_col(row, "instructor_id")?,
        room_id: uuid_col(row, "room_id")?,
        label: row.get("section_label")?,
        weekday,
        window,
        capacity,
        term: term_col(row, "section_term")?,
    };
    Ok(SectionDetail {
        course: Course {
            id: section.course_id,
            code: row.get("course_code")?,
            name: row.get("course_name")?,
            credits,
        },
        room: Room {
            id: section.room_id,
            name: row.get("room_name")?,
        },
        instructor: parse_user(row, &INSTRUCTOR)?,
        section,
    })
}

/// Whether a row with `id` exists in `table`.
///
/// `table` must be a trusted identifier.
pub(crate) fn row_exists(conn: &Connection, table: &'static str, id: Uuid) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1);"),
        [id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
