//! Reference data hydrated into sections and enrollment records.
//!
//! # Responsibility
//! - Define courses, rooms and user profiles.
//! - Normalize the names/codes that carry uniqueness constraints.
//!
//! # Invariants
//! - Course codes are stored upper-case without whitespace.
//! - Only students carry an `advisor_id`.

use crate::model::principal::{Role, UserId};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type CourseId = Uuid;
pub type RoomId = Uuid;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));
static COURSE_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9][A-Z0-9-]{1,19}$").expect("valid course code regex"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Rejected reference-data input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogValidationError {
    BlankName,
    InvalidCourseCode(String),
    InvalidEmail(String),
    NonPositiveCredits,
    AdvisorOnNonStudent,
}

impl Display for CatalogValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "name must not be blank"),
            Self::InvalidCourseCode(code) => write!(f, "invalid course code `{code}`"),
            Self::InvalidEmail(email) => write!(f, "invalid email `{email}`"),
            Self::NonPositiveCredits => write!(f, "course credits must be positive"),
            Self::AdvisorOnNonStudent => write!(f, "only students can have an advisor"),
        }
    }
}

impl Error for CatalogValidationError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    /// Unique, normalized code (e.g. `IF2101`).
    pub code: String,
    pub name: String,
    /// Credit units.
    pub credits: u32,
}

impl Course {
    /// Builds a course with a fresh id after normalizing its code and name.
    pub fn new(
        code: &str,
        name: &str,
        credits: u32,
    ) -> Result<Self, CatalogValidationError> {
        if credits == 0 {
            return Err(CatalogValidationError::NonPositiveCredits);
        }
        Ok(Self {
            id: Uuid::new_v4(),
            code: normalize_course_code(code)?,
            name: normalize_name(name)?,
            credits,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
}

impl Room {
    pub fn new(name: &str) -> Result<Self, CatalogValidationError> {
        Ok(Self {
            id: Uuid::new_v4(),
            name: normalize_name(name)?,
        })
    }
}

/// Directory entry for any user the rules need to look at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Institutional student number; students only.
    pub student_number: Option<String>,
    /// Assigned academic advisor; students only.
    pub advisor_id: Option<UserId>,
}

impl UserProfile {
    pub fn new(name: &str, email: &str, role: Role) -> Result<Self, CatalogValidationError> {
        let email = email.trim().to_ascii_lowercase();
        if !EMAIL_RE.is_match(&email) {
            return Err(CatalogValidationError::InvalidEmail(email));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name: normalize_name(name)?,
            email,
            role,
            student_number: None,
            advisor_id: None,
        })
    }

    /// Assigns an advisor; rejected for non-students.
    pub fn with_advisor(mut self, advisor_id: UserId) -> Result<Self, CatalogValidationError> {
        if self.role != Role::Student {
            return Err(CatalogValidationError::AdvisorOnNonStudent);
        }
        self.advisor_id = Some(advisor_id);
        Ok(self)
    }

    pub fn with_student_number(mut self, number: &str) -> Self {
        self.student_number = Some(number.trim().to_string());
        self
    }

    /// Whether `advisor_id` is this student's assigned advisor.
    pub fn is_advised_by(&self, advisor_id: UserId) -> bool {
        self.advisor_id == Some(advisor_id)
    }
}

/// Upper-cases a course code and strips all whitespace (`" if 2101"` ->
/// `"IF2101"`).
pub fn normalize_course_code(raw: &str) -> Result<String, CatalogValidationError> {
    let compact = WHITESPACE_RE.replace_all(raw.trim(), "").to_ascii_uppercase();
    if !COURSE_CODE_RE.is_match(&compact) {
        return Err(CatalogValidationError::InvalidCourseCode(raw.to_string()));
    }
    Ok(compact)
}

/// Trims and collapses inner whitespace runs to one space.
pub fn normalize_name(raw: &str) -> Result<String, CatalogValidationError> {
    let collapsed = WHITESPACE_RE.replace_all(raw.trim(), " ").into_owned();
    if collapsed.is_empty() {
        return Err(CatalogValidationError::BlankName);
    }
    Ok(collapsed)
}

#[cfg(test)]
mod tests {
    use super::{normalize_course_code, normalize_name, CatalogValidationError, UserProfile};
    use crate::model::principal::Role;
    use uuid::Uuid;

    #[test]
    fn course_codes_are_compacted_and_uppercased() {
        assert_eq!(normalize_course_code(" if 21 01 ").unwrap(), "IF2101");
        assert_eq!(normalize_course_code("mk-001").unwrap(), "MK-001");
    }

    #[test]
    fn course_codes_reject_symbols() {
        assert!(matches!(
            normalize_course_code("IF#01"),
            Err(CatalogValidationError::InvalidCourseCode(_))
        ));
        assert!(normalize_course_code("").is_err());
    }

    #[test]
    fn names_collapse_whitespace() {
        assert_eq!(normalize_name("  Lab   Komputer\t2 ").unwrap(), "Lab Komputer 2");
        assert_eq!(normalize_name("   "), Err(CatalogValidationError::BlankName));
    }

    #[test]
    fn only_students_take_an_advisor() {
        let lecturer = UserProfile::new("Dr. Sari", "sari@kampus.ac.id", Role::Lecturer).unwrap();
        assert_eq!(
            lecturer.with_advisor(Uuid::new_v4()),
            Err(CatalogValidationError::AdvisorOnNonStudent)
        );

        let advisor = Uuid::new_v4();
        let student = UserProfile::new("Budi", "BUDI@kampus.ac.id", Role::Student)
            .unwrap()
            .with_advisor(advisor)
            .unwrap();
        assert_eq!(student.email, "budi@kampus.ac.id");
        assert!(student.is_advised_by(advisor));
        assert!(!student.is_advised_by(Uuid::new_v4()));
    }
}
