//! Section catalog repository and room-slot conflict detection.
//!
//! # Responsibility
//! - Persist class sections and load them hydrated.
//! - Answer "is this room already booked for an overlapping window?".
//!
//! # Invariants
//! - Insert and update re-check the room slot inside the same IMMEDIATE
//!   transaction as the write, so two writers cannot book one slot.
//! - Slot checks are scoped by offering term.

use super::rows::{
    parse_section_detail, row_exists, time_to_db, weekday_to_db, SECTION_COLUMNS, SECTION_JOINS,
};
use super::{Entity, RepoError, RepoResult};
use crate::clock::Term;
use crate::model::catalog::RoomId;
use crate::model::section::{ClassSection, SectionDetail, SectionId, TimeWindow};
use chrono::Weekday;
use log::warn;
use rusqlite::{params, Connection, Transaction, TransactionBehavior};

/// Room, day and window to test for a booking conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotQuery {
    pub room_id: RoomId,
    pub weekday: Weekday,
    pub window: TimeWindow,
    pub term: Term,
    /// Section to ignore, i.e. the one being updated.
    pub exclude: Option<SectionId>,
}

impl SlotQuery {
    /// Probe for `section`'s own slot, excluding `section` itself when
    /// `exclude_self` is set.
    pub fn for_section(section: &ClassSection, exclude_self: bool) -> Self {
        Self {
            room_id: section.room_id,
            weekday: section.weekday,
            window: section.window,
            term: section.term,
            exclude: exclude_self.then_some(section.id),
        }
    }
}

/// Repository interface for the section catalog.
pub trait SectionRepository {
    /// Inserts a section unless its room slot is taken.
    fn insert_section(&self, section: &ClassSection) -> RepoResult<SectionDetail>;
    /// Replaces a stored section unless its new room slot is taken by another
    /// section.
    fn update_section(&self, section: &ClassSection) -> RepoResult<SectionDetail>;
    fn get_section(&self, id: SectionId) -> RepoResult<Option<SectionDetail>>;
    /// Lists sections, optionally only those offered in `term`.
    fn list_sections(&self, term: Option<Term>) -> RepoResult<Vec<SectionDetail>>;
    /// Deletes a section that no enrollment item references.
    fn delete_section(&self, id: SectionId) -> RepoResult<()>;
    fn has_room_conflict(&self, query: &SlotQuery) -> RepoResult<bool>;
}

/// SQLite-backed section repository.
pub struct SqliteSectionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSectionRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SectionRepository for SqliteSectionRepository<'_> {
    fn insert_section(&self, section: &ClassSection) -> RepoResult<SectionDetail> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_references_exist(&tx, section)?;
        ensure_slot_free(&tx, &SlotQuery::for_section(section, false))?;

        tx.execute(
            "INSERT INTO sections (
                id,
                course_id,
                instructor_id,
                room_id,
                label,
                weekday,
                starts_at_sec,
                ends_at_sec,
                capacity,
                term
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                section.id.to_string(),
                section.course_id.to_string(),
                section.instructor_id.to_string(),
                section.room_id.to_string(),
                section.label.as_str(),
                weekday_to_db(section.weekday),
                time_to_db(section.window.start()),
                time_to_db(section.window.end()),
                i64::from(section.capacity),
                section.term.as_str(),
            ],
        )?;
        tx.commit()?;

        load_required_section(self.conn, section.id)
    }

    fn update_section(&self, section: &ClassSection) -> RepoResult<SectionDetail> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if !row_exists(&tx, "sections", section.id)? {
            return Err(RepoError::not_found(Entity::Section, section.id));
        }
        ensure_references_exist(&tx, section)?;
        ensure_slot_free(&tx, &SlotQuery::for_section(section, true))?;

        tx.execute(
            "UPDATE sections
             SET
                course_id = ?2,
                instructor_id = ?3,
                room_id = ?4,
                label = ?5,
                weekday = ?6,
                starts_at_sec = ?7,
                ends_at_sec = ?8,
                capacity = ?9,
                term = ?10
             WHERE id = ?1;",
            params![
                section.id.to_string(),
                section.course_id.to_string(),
                section.instructor_id.to_string(),
                section.room_id.to_string(),
                section.label.as_str(),
                weekday_to_db(section.weekday),
                time_to_db(section.window.start()),
                time_to_db(section.window.end()),
                i64::from(section.capacity),
                section.term.as_str(),
            ],
        )?;
        tx.commit()?;

        load_required_section(self.conn, section.id)
    }

    fn get_section(&self, id: SectionId) -> RepoResult<Option<SectionDetail>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SECTION_COLUMNS} FROM sections s {SECTION_JOINS} WHERE s.id = ?1;"
        ))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_section_detail(row)?));
        }
        Ok(None)
    }

    fn list_sections(&self, term: Option<Term>) -> RepoResult<Vec<SectionDetail>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SECTION_COLUMNS}
             FROM sections s {SECTION_JOINS}
             WHERE (?1 IS NULL OR s.term = ?1)
             ORDER BY c.code ASC, s.label ASC, s.id ASC;"
        ))?;
        let mut rows = stmt.query([term.map(Term::as_str)])?;
        let mut sections = Vec::new();
        while let Some(row) = rows.next()? {
            sections.push(parse_section_detail(row)?);
        }
        Ok(sections)
    }

    fn delete_section(&self, id: SectionId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let referenced: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM enrollment_items WHERE section_id = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        if referenced == 1 {
            return Err(RepoError::SectionInUse(id));
        }

        let changed = tx.execute("DELETE FROM sections WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found(Entity::Section, id));
        }
        tx.commit()?;
        Ok(())
    }

    fn has_room_conflict(&self, query: &SlotQuery) -> RepoResult<bool> {
        has_room_conflict_in(self.conn, query)
    }
}

/// Half-open overlap on one room/day/term: `start < other_end AND
/// other_start < end`.
fn has_room_conflict_in(conn: &Connection, query: &SlotQuery) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sections
            WHERE room_id = ?1
              AND weekday = ?2
              AND term = ?3
              AND starts_at_sec < ?5
              AND ?4 < ends_at_sec
              AND (?6 IS NULL OR id <> ?6)
        );",
        params![
            query.room_id.to_string(),
            weekday_to_db(query.weekday),
            query.term.as_str(),
            time_to_db(query.window.start()),
            time_to_db(query.window.end()),
            query.exclude.map(|id| id.to_string()),
        ],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn ensure_slot_free(conn: &Connection, query: &SlotQuery) -> RepoResult<()> {
    if has_room_conflict_in(conn, query)? {
        warn!(
            "event=section_slot_conflict module=repo status=rejected room_id={} weekday={} window={} term={}",
            query.room_id, query.weekday, query.window, query.term
        );
        return Err(RepoError::SlotTaken {
            room_id: query.room_id,
            weekday: query.weekday,
            window: query.window,
        });
    }
    Ok(())
}

fn ensure_references_exist(conn: &Connection, section: &ClassSection) -> RepoResult<()> {
    if !row_exists(conn, "courses", section.course_id)? {
        return Err(RepoError::not_found(Entity::Course, section.course_id));
    }
    if !row_exists(conn, "rooms", section.room_id)? {
        return Err(RepoError::not_found(Entity::Room, section.room_id));
    }
    if !row_exists(conn, "users", section.instructor_id)? {
        return Err(RepoError::not_found(Entity::User, section.instructor_id));
    }
    Ok(())
}

fn load_required_section(conn: &Connection, id: SectionId) -> RepoResult<SectionDetail> {
    SqliteSectionRepository::new(conn)
        .get_section(id)?
        .ok_or(RepoError::not_found(Entity::Section, id))
}
