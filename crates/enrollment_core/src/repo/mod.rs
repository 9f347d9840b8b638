//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//! - Run every multi-row mutation inside one transaction.
//!
//! # Invariants
//! - Read paths return fully hydrated aggregates; callers never issue
//!   follow-up lookups for nested relations.
//! - Repository APIs return semantic errors (`NotFound`, `StaleItem`,
//!   `SlotTaken`, `Duplicate`) in addition to DB transport errors.

use crate::db::DbError;
use crate::model::enrollment::{ItemId, ItemStatus};
use crate::model::catalog::RoomId;
use crate::model::section::{SectionId, TimeWindow};
use chrono::Weekday;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod catalog_repo;
pub mod enrollment_repo;
mod rows;
pub mod section_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Entity kinds reported by `RepoError::NotFound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    Course,
    Room,
    Section,
    Record,
    Item,
}

impl Display for Entity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::User => "user",
            Self::Course => "course",
            Self::Room => "room",
            Self::Section => "section",
            Self::Record => "enrollment record",
            Self::Item => "enrollment item",
        };
        f.write_str(name)
    }
}

/// Repository error shared by all SQLite repositories.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound { entity: Entity, id: Uuid },
    /// Compare-and-set update found the item in a different status.
    StaleItem { item_id: ItemId, expected: ItemStatus },
    /// Room already booked for an overlapping window.
    SlotTaken {
        room_id: RoomId,
        weekday: Weekday,
        window: TimeWindow,
    },
    /// Uniqueness constraint rejected the write.
    Duplicate(String),
    /// Section is still referenced by enrollment items.
    SectionInUse(SectionId),
    InvalidData(String),
}

impl RepoError {
    pub fn not_found(entity: Entity, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::StaleItem { item_id, expected } => write!(
                f,
                "enrollment item {item_id} is no longer {expected}; reload and retry"
            ),
            Self::SlotTaken {
                room_id,
                weekday,
                window,
            } => write!(
                f,
                "room {room_id} is already used on {weekday} during {window}"
            ),
            Self::Duplicate(what) => write!(f, "duplicate {what}"),
            Self::SectionInUse(id) => {
                write!(f, "section {id} still has enrollment items")
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

/// Maps a uniqueness violation to `Duplicate(what)`, passing other errors
/// through.
fn map_constraint(err: rusqlite::Error, what: impl FnOnce() -> String) -> RepoError {
    let db_err = DbError::Sqlite(err);
    if db_err.is_constraint_violation() {
        RepoError::Duplicate(what())
    } else {
        RepoError::Db(db_err)
    }
}
