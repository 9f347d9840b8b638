//! Student-side duplicate and schedule rules.
//!
//! # Responsibility
//! - Decide whether candidate sections can join a student's live items.
//!
//! # Invariants
//! - Only live (non-terminal) items are passed in as `held`.
//! - Schedule overlap ignores rooms: a student cannot sit two classes that
//!   meet on the same weekday with overlapping windows.
//! - Checks run in a fixed order so the first reported violation is stable:
//!   duplicates inside the request, then against held items, then schedule.

use crate::model::section::SectionDetail;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// First rule a candidate set breaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleViolation {
    /// Two candidates belong to the same course.
    DuplicateCourseInRequest { course_code: String },
    /// Candidate section is already a live item.
    SectionAlreadyHeld { section: String },
    /// Candidate's course is already covered by a live item.
    CourseAlreadyHeld { course_code: String },
    /// Two sections meet on the same day with overlapping windows.
    ScheduleOverlap { first: String, second: String },
}

impl Display for RuleViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateCourseInRequest { course_code } => {
                write!(f, "course {course_code} was selected more than once")
            }
            Self::SectionAlreadyHeld { section } => {
                write!(f, "already enrolled in section {section}")
            }
            Self::CourseAlreadyHeld { course_code } => {
                write!(f, "already enrolled in course {course_code}")
            }
            Self::ScheduleOverlap { first, second } => {
                write!(f, "schedule conflict between {first} and {second}")
            }
        }
    }
}

impl Error for RuleViolation {}

/// Checks `candidates` against each other and against `held`.
pub fn check_candidates(
    held: &[&SectionDetail],
    candidates: &[&SectionDetail],
) -> Result<(), RuleViolation> {
    let mut requested_courses = HashSet::new();
    for candidate in candidates {
        if !requested_courses.insert(candidate.section.course_id) {
            return Err(RuleViolation::DuplicateCourseInRequest {
                course_code: candidate.course_code().to_string(),
            });
        }
    }

    for candidate in candidates {
        if held.iter().any(|item| item.id() == candidate.id()) {
            return Err(RuleViolation::SectionAlreadyHeld {
                section: candidate.display_name(),
            });
        }
        if held
            .iter()
            .any(|item| item.section.course_id == candidate.section.course_id)
        {
            return Err(RuleViolation::CourseAlreadyHeld {
                course_code: candidate.course_code().to_string(),
            });
        }
    }

    let union: Vec<&SectionDetail> = held.iter().chain(candidates).copied().collect();
    for (index, first) in union.iter().enumerate() {
        for second in &union[index + 1..] {
            if first.section.meets_concurrently_with(&second.section) {
                return Err(RuleViolation::ScheduleOverlap {
                    first: first.display_name(),
                    second: second.display_name(),
                });
            }
        }
    }
    Ok(())
}
