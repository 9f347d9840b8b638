//! Enrollment record repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Find-or-create a student's term registration and hydrate it.
//! - Apply item mutations as compare-and-set updates on the expected status.
//! - Keep item-plus-record writes inside one transaction.
//! - Run enrollment admission checks against state read inside the write
//!   transaction that inserts the items.
//!
//! # Invariants
//! - At most one record per `(student_id, term)`; creation is an
//!   `INSERT .. ON CONFLICT DO NOTHING` followed by a read, never a
//!   read-then-insert race.
//! - Returned records carry every item with section, course, room,
//!   instructor and the student's advisor reference.

use super::rows::{
    item_status_col, parse_section_detail, parse_user, record_status_col, term_col, uuid_col,
    PLAIN_USER, SECTION_COLUMNS, SECTION_JOINS, USER_COLUMNS,
};
use super::{map_constraint, Entity, RepoError, RepoResult};
use crate::clock::Term;
use crate::model::catalog::UserProfile;
use crate::model::enrollment::{EnrollmentItem, EnrollmentRecord, ItemId, ItemStatus, RecordId};
use crate::model::principal::UserId;
use crate::model::section::{SectionDetail, SectionId};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Params, Transaction, TransactionBehavior};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

/// Compare-and-set status change for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemChange {
    pub item_id: ItemId,
    pub expected: ItemStatus,
    pub next: ItemStatus,
    /// Epoch ms stamped into the timestamp column matching `next`, if any.
    pub at: i64,
}

/// Repository interface for enrollment records and items.
pub trait EnrollmentRepository {
    /// Returns the student's record for `term`, creating a `Draft` one at
    /// `now_ms` when none exists.
    fn get_or_create_record(
        &self,
        student_id: UserId,
        term: Term,
        now_ms: i64,
    ) -> RepoResult<EnrollmentRecord>;
    /// Loads the record without creating it.
    fn find_record(&self, student_id: UserId, term: Term) -> RepoResult<Option<EnrollmentRecord>>;
    /// Loads hydrated sections in request order; any missing id is `NotFound`.
    fn sections_by_ids(&self, ids: &[SectionId]) -> RepoResult<Vec<SectionDetail>>;
    /// Sections offered in `term`, minus `excluded`.
    fn offered_sections(
        &self,
        term: Term,
        excluded: &HashSet<SectionId>,
    ) -> RepoResult<Vec<SectionDetail>>;
    /// Inserts one `Active` item per section, all or nothing.
    ///
    /// `check` sees the record and the requested sections as read inside the
    /// write transaction; an error from it rolls back without writing.
    fn insert_items<E, F>(
        &self,
        record_id: RecordId,
        section_ids: &[SectionId],
        now_ms: i64,
        check: F,
    ) -> Result<Vec<ItemId>, E>
    where
        E: From<RepoError>,
        F: FnOnce(&EnrollmentRecord, &[SectionDetail]) -> Result<(), E>;
    /// Deletes an item, optionally only while it holds `expected`.
    fn delete_item(&self, item_id: ItemId, expected: Option<ItemStatus>) -> RepoResult<()>;
    /// Applies a status change to one item.
    fn transition_item(&self, change: &ItemChange) -> RepoResult<()>;
    /// Applies an advisor review to one item and verifies its record, atomically.
    fn review_item(&self, record_id: RecordId, change: &ItemChange) -> RepoResult<()>;
    /// Moves an item to another section and resets it to `Active`.
    fn reassign_item(
        &self,
        item_id: ItemId,
        expected: ItemStatus,
        new_section_id: SectionId,
    ) -> RepoResult<()>;
    fn set_advisor_note(&self, record_id: RecordId, note: &str) -> RepoResult<()>;
    /// Students whose advisor is `advisor_id`.
    fn list_advisees(&self, advisor_id: UserId) -> RepoResult<Vec<UserProfile>>;
}

/// SQLite-backed enrollment repository.
pub struct SqliteEnrollmentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEnrollmentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl EnrollmentRepository for SqliteEnrollmentRepository<'_> {
    fn get_or_create_record(
        &self,
        student_id: UserId,
        term: Term,
        now_ms: i64,
    ) -> RepoResult<EnrollmentRecord> {
        if let Some(record) = self.find_record(student_id, term)? {
            return Ok(record);
        }

        if load_student(self.conn, student_id)?.is_none() {
            return Err(RepoError::not_found(Entity::User, student_id));
        }

        self.conn.execute(
            "INSERT INTO enrollment_records (
                id,
                student_id,
                term,
                status,
                advisor_note,
                created_at,
                verified_at
            ) VALUES (?1, ?2, ?3, 'draft', '', ?4, NULL)
            ON CONFLICT (student_id, term) DO NOTHING;",
            params![
                Uuid::new_v4().to_string(),
                student_id.to_string(),
                term.as_str(),
                now_ms,
            ],
        )?;

        self.find_record(student_id, term)?.ok_or_else(|| {
            RepoError::InvalidData(format!(
                "enrollment record for student {student_id} vanished after insert"
            ))
        })
    }

    fn find_record(&self, student_id: UserId, term: Term) -> RepoResult<Option<EnrollmentRecord>> {
        load_record(
            self.conn,
            "student_id = ?1 AND term = ?2",
            params![student_id.to_string(), term.as_str()],
        )
    }

    fn sections_by_ids(&self, ids: &[SectionId]) -> RepoResult<Vec<SectionDetail>> {
        load_sections(self.conn, ids)
    }

    fn offered_sections(
        &self,
        term: Term,
        excluded: &HashSet<SectionId>,
    ) -> RepoResult<Vec<SectionDetail>> {
        let mut sql = format!(
            "SELECT {SECTION_COLUMNS} FROM sections s {SECTION_JOINS} WHERE s.term = ?"
        );
        let mut bind_values = vec![Value::Text(term.as_str().to_string())];
        if !excluded.is_empty() {
            sql.push_str(" AND s.id NOT IN (");
            sql.push_str(&vec!["?"; excluded.len()].join(", "));
            sql.push(')');
            bind_values.extend(excluded.iter().map(|id| Value::Text(id.to_string())));
        }
        sql.push_str(" ORDER BY c.code ASC, s.label ASC, s.id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut sections = Vec::new();
        while let Some(row) = rows.next()? {
            sections.push(parse_section_detail(row)?);
        }
        Ok(sections)
    }

    fn insert_items<E, F>(
        &self,
        record_id: RecordId,
        section_ids: &[SectionId],
        now_ms: i64,
        check: F,
    ) -> Result<Vec<ItemId>, E>
    where
        E: From<RepoError>,
        F: FnOnce(&EnrollmentRecord, &[SectionDetail]) -> Result<(), E>,
    {
        // IMMEDIATE takes the write lock before the first read, so the record
        // cannot change between `check` and the inserts.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(RepoError::from)?;
        let record = load_record(&tx, "id = ?1", [record_id.to_string()])?
            .ok_or(RepoError::not_found(Entity::Record, record_id))?;
        let requested = load_sections(&tx, section_ids)?;
        check(&record, requested.as_slice())?;

        let mut inserted = Vec::with_capacity(section_ids.len());
        for section_id in section_ids {
            let item_id = Uuid::new_v4();
            tx.execute(
                "INSERT INTO enrollment_items (
                    id,
                    record_id,
                    section_id,
                    status,
                    created_at,
                    cancellation_requested_at,
                    cancelled_at
                ) VALUES (?1, ?2, ?3, 'active', ?4, NULL, NULL);",
                params![
                    item_id.to_string(),
                    record_id.to_string(),
                    section_id.to_string(),
                    now_ms,
                ],
            )
            .map_err(|err| map_constraint(err, || format!("enrollment of section {section_id}")))?;
            inserted.push(item_id);
        }
        tx.commit().map_err(RepoError::from)?;
        Ok(inserted)
    }

    fn delete_item(&self, item_id: ItemId, expected: Option<ItemStatus>) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM enrollment_items WHERE id = ?1 AND (?2 IS NULL OR status = ?2);",
            params![item_id.to_string(), expected.map(ItemStatus::as_str)],
        )?;
        if changed == 0 {
            return Err(missing_or_stale(self.conn, item_id, expected)?);
        }
        Ok(())
    }

    fn transition_item(&self, change: &ItemChange) -> RepoResult<()> {
        apply_item_change(self.conn, change)
    }

    fn review_item(&self, record_id: RecordId, change: &ItemChange) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        apply_item_change(&tx, change)?;
        let changed = tx.execute(
            "UPDATE enrollment_records
             SET status = 'verified',
                 verified_at = ?2
             WHERE id = ?1;",
            params![record_id.to_string(), change.at],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(Entity::Record, record_id));
        }
        tx.commit()?;
        Ok(())
    }

    fn reassign_item(
        &self,
        item_id: ItemId,
        expected: ItemStatus,
        new_section_id: SectionId,
    ) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE enrollment_items
                 SET section_id = ?3,
                     status = 'active',
                     cancellation_requested_at = NULL,
                     cancelled_at = NULL
                 WHERE id = ?1 AND status = ?2;",
                params![item_id.to_string(), expected.as_str(), new_section_id.to_string()],
            )
            .map_err(|err| {
                map_constraint(err, || format!("enrollment of section {new_section_id}"))
            })?;
        if changed == 0 {
            return Err(missing_or_stale(self.conn, item_id, Some(expected))?);
        }
        Ok(())
    }

    fn set_advisor_note(&self, record_id: RecordId, note: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE enrollment_records SET advisor_note = ?2 WHERE id = ?1;",
            params![record_id.to_string(), note],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(Entity::Record, record_id));
        }
        Ok(())
    }

    fn list_advisees(&self, advisor_id: UserId) -> RepoResult<Vec<UserProfile>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {USER_COLUMNS}
             FROM users
             WHERE role = 'student' AND advisor_id = ?1
             ORDER BY name ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([advisor_id.to_string()])?;
        let mut students = Vec::new();
        while let Some(row) = rows.next()? {
            students.push(parse_user(row, &PLAIN_USER)?);
        }
        Ok(students)
    }
}

fn apply_item_change(conn: &Connection, change: &ItemChange) -> RepoResult<()> {
    let changed = conn.execute(
        "UPDATE enrollment_items
         SET status = ?3,
             cancellation_requested_at = CASE
                WHEN ?3 = 'cancellation_requested' THEN ?4
                ELSE cancellation_requested_at
             END,
             cancelled_at = CASE
                WHEN ?3 = 'cancelled' THEN ?4
                ELSE cancelled_at
             END
         WHERE id = ?1 AND status = ?2;",
        params![
            change.item_id.to_string(),
            change.expected.as_str(),
            change.next.as_str(),
            change.at,
        ],
    )?;
    if changed == 0 {
        return Err(missing_or_stale(conn, change.item_id, Some(change.expected))?);
    }
    Ok(())
}

/// Explains a zero-row conditional write.
fn missing_or_stale(
    conn: &Connection,
    item_id: ItemId,
    expected: Option<ItemStatus>,
) -> RepoResult<RepoError> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM enrollment_items WHERE id = ?1);",
        [item_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(match (exists == 1, expected) {
        (true, Some(expected)) => RepoError::StaleItem { item_id, expected },
        _ => RepoError::not_found(Entity::Item, item_id),
    })
}

fn load_record<P: Params>(
    conn: &Connection,
    filter: &str,
    params: P,
) -> RepoResult<Option<EnrollmentRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, student_id, term, status, advisor_note, created_at, verified_at
         FROM enrollment_records
         WHERE {filter};"
    ))?;
    let mut rows = stmt.query(params)?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };

    let id = uuid_col(row, "id")?;
    let student_id = uuid_col(row, "student_id")?;
    let student = load_student(conn, student_id)?
        .ok_or(RepoError::not_found(Entity::User, student_id))?;

    Ok(Some(EnrollmentRecord {
        id,
        student,
        term: term_col(row, "term")?,
        status: record_status_col(row, "status")?,
        advisor_note: row.get("advisor_note")?,
        created_at: row.get("created_at")?,
        verified_at: row.get("verified_at")?,
        items: load_items(conn, id)?,
    }))
}

/// Hydrated sections in `ids` order; any missing id is `NotFound`.
fn load_sections(conn: &Connection, ids: &[SectionId]) -> RepoResult<Vec<SectionDetail>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = vec!["?"; ids.len()].join(", ");
    let mut stmt = conn.prepare(&format!(
        "SELECT {SECTION_COLUMNS} FROM sections s {SECTION_JOINS} WHERE s.id IN ({placeholders});"
    ))?;
    let mut rows = stmt.query(params_from_iter(ids.iter().map(|id| id.to_string())))?;
    let mut found = BTreeMap::new();
    while let Some(row) = rows.next()? {
        let detail = parse_section_detail(row)?;
        found.insert(detail.id(), detail);
    }

    ids.iter()
        .map(|id| {
            found
                .get(id)
                .cloned()
                .ok_or(RepoError::not_found(Entity::Section, *id))
        })
        .collect()
}

fn load_student(conn: &Connection, student_id: UserId) -> RepoResult<Option<UserProfile>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = ?1 AND role = 'student';"
    ))?;
    let mut rows = stmt.query([student_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_user(row, &PLAIN_USER)?));
    }
    Ok(None)
}

fn load_items(conn: &Connection, record_id: RecordId) -> RepoResult<BTreeMap<ItemId, EnrollmentItem>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT
            i.id AS item_id,
            i.record_id AS record_id,
            i.status AS item_status,
            i.created_at AS item_created_at,
            i.cancellation_requested_at AS cancellation_requested_at,
            i.cancelled_at AS cancelled_at,
            {SECTION_COLUMNS}
         FROM enrollment_items i
         INNER JOIN sections s ON s.id = i.section_id
         {SECTION_JOINS}
         WHERE i.record_id = ?1;"
    ))?;
    let mut rows = stmt.query([record_id.to_string()])?;
    let mut items = BTreeMap::new();
    while let Some(row) = rows.next()? {
        let item = EnrollmentItem {
            id: uuid_col(row, "item_id")?,
            record_id: uuid_col(row, "record_id")?,
            section: parse_section_detail(row)?,
            status: item_status_col(row, "item_status")?,
            created_at: row.get("item_created_at")?,
            cancellation_requested_at: row.get("cancellation_requested_at")?,
            cancelled_at: row.get("cancelled_at")?,
        };
        items.insert(item.id, item);
    }
    Ok(items)
}
