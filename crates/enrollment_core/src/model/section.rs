//! Class sections and the time-window overlap rule.
//!
//! # Responsibility
//! - Define scheduled offerings bound to a room, weekday and time window.
//! - Own the single overlap predicate shared by room checks and student
//!   schedule checks.
//!
//! # Invariants
//! - Windows are half-open `[start, end)` with `start < end`.
//! - Two windows overlap iff `a.start < b.end && b.start < a.end`; back-to-back
//!   windows never overlap.

use crate::clock::Term;
use crate::model::catalog::{Course, CourseId, Room, RoomId, UserProfile};
use crate::model::principal::UserId;
use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type SectionId = Uuid;

/// Rejected section definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionValidationError {
    EmptyWindow { start: NaiveTime, end: NaiveTime },
    ZeroCapacity,
    BlankLabel,
}

impl Display for SectionValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyWindow { start, end } => {
                write!(f, "section window must start before it ends: {start}..{end}")
            }
            Self::ZeroCapacity => write!(f, "section capacity must be positive"),
            Self::BlankLabel => write!(f, "section label must not be blank"),
        }
    }
}

impl Error for SectionValidationError {}

/// Half-open time-of-day window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTimeWindow")]
pub struct TimeWindow {
    start: NaiveTime,
    end: NaiveTime,
}

/// Unchecked wire shape; deserialization validates it through `TimeWindow::new`.
#[derive(Deserialize)]
struct RawTimeWindow {
    start: NaiveTime,
    end: NaiveTime,
}

impl TryFrom<RawTimeWindow> for TimeWindow {
    type Error = SectionValidationError;

    fn try_from(raw: RawTimeWindow) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, SectionValidationError> {
        if start >= end {
            return Err(SectionValidationError::EmptyWindow { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl Display for TimeWindow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

/// Scheduled offering of a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSection {
    pub id: SectionId,
    pub course_id: CourseId,
    pub instructor_id: UserId,
    pub room_id: RoomId,
    /// Short display label, e.g. `A`.
    pub label: String,
    pub weekday: Weekday,
    pub window: TimeWindow,
    /// Informational; not enforced.
    pub capacity: u32,
    /// Offering term.
    pub term: Term,
}

impl ClassSection {
    /// Whether both sections meet on the same weekday with overlapping
    /// windows, regardless of room.
    pub fn meets_concurrently_with(&self, other: &ClassSection) -> bool {
        self.weekday == other.weekday && self.window.overlaps(&other.window)
    }
}

/// Section hydrated with the relations the enrollment rules read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionDetail {
    pub section: ClassSection,
    pub course: Course,
    pub room: Room,
    pub instructor: UserProfile,
}

impl SectionDetail {
    pub fn id(&self) -> SectionId {
        self.section.id
    }

    pub fn course_code(&self) -> &str {
        self.course.code.as_str()
    }

    /// `CODE-label`, used in conflict messages.
    pub fn display_name(&self) -> String {
        format!("{}-{}", self.course.code, self.section.label)
    }
}

/// Admin input for a new section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSection {
    pub course_id: CourseId,
    pub instructor_id: UserId,
    pub room_id: RoomId,
    pub label: String,
    pub weekday: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub capacity: u32,
    pub term: Term,
}

impl NewSection {
    /// Validates the input and assigns a fresh id.
    pub fn into_section(self) -> Result<ClassSection, SectionValidationError> {
        let label = self.label.trim().to_string();
        if label.is_empty() {
            return Err(SectionValidationError::BlankLabel);
        }
        if self.capacity == 0 {
            return Err(SectionValidationError::ZeroCapacity);
        }
        Ok(ClassSection {
            id: Uuid::new_v4(),
            course_id: self.course_id,
            instructor_id: self.instructor_id,
            room_id: self.room_id,
            label,
            weekday: self.weekday,
            window: TimeWindow::new(self.start, self.end)?,
            capacity: self.capacity,
            term: self.term,
        })
    }
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionPatch {
    pub course_id: Option<CourseId>,
    pub instructor_id: Option<UserId>,
    pub room_id: Option<RoomId>,
    pub label: Option<String>,
    pub weekday: Option<Weekday>,
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
    pub capacity: Option<u32>,
    pub term: Option<Term>,
}

impl SectionPatch {
    /// Applies the patch onto `current` and re-validates the merged section.
    pub fn apply_to(self, current: &ClassSection) -> Result<ClassSection, SectionValidationError> {
        let merged = NewSection {
            course_id: self.course_id.unwrap_or(current.course_id),
            instructor_id: self.instructor_id.unwrap_or(current.instructor_id),
            room_id: self.room_id.unwrap_or(current.room_id),
            label: self.label.unwrap_or_else(|| current.label.clone()),
            weekday: self.weekday.unwrap_or(current.weekday),
            start: self.start.unwrap_or(current.window.start()),
            end: self.end.unwrap_or(current.window.end()),
            capacity: self.capacity.unwrap_or(current.capacity),
            term: self.term.unwrap_or(current.term),
        };
        let mut section = merged.into_section()?;
        section.id = current.id;
        Ok(section)
    }
}
