//! Error taxonomy shared by all workflow services.
//!
//! # Responsibility
//! - Classify every service failure into one `ErrorKind`.
//! - Carry enough context for a host to render a useful message.
//!
//! # Invariants
//! - Repository `NotFound` stays `NotFound`; write races and uniqueness
//!   violations surface as `Conflict`; transport failures are `Storage`.

use crate::clock::Term;
use crate::model::enrollment::TransitionError;
use crate::model::principal::UserId;
use crate::model::section::SectionId;
use crate::repo::RepoError;
use crate::service::authz::AccessDenied;
use crate::service::rules::RuleViolation;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Coarse failure class hosts map to user-facing responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Conflict,
    NotFound,
    Forbidden,
    InvalidTransition,
    InvalidInput,
    Storage,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Conflict => "conflict",
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::InvalidTransition => "invalid_transition",
            Self::InvalidInput => "invalid_input",
            Self::Storage => "storage",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&RepoError> for ErrorKind {
    fn from(value: &RepoError) -> Self {
        match value {
            RepoError::NotFound { .. } => Self::NotFound,
            RepoError::StaleItem { .. }
            | RepoError::SlotTaken { .. }
            | RepoError::Duplicate(_)
            | RepoError::SectionInUse(_) => Self::Conflict,
            RepoError::Db(_) | RepoError::InvalidData(_) => Self::Storage,
        }
    }
}

/// Errors from student and advisor workflows.
#[derive(Debug)]
pub enum EnrollmentError {
    /// Caller lacks the role the operation needs.
    Forbidden(AccessDenied),
    /// Lecturer is not the student's assigned advisor.
    NotAdvisor {
        advisor_id: UserId,
        student_id: UserId,
    },
    /// Request carried no sections.
    EmptyRequest,
    /// Section exists but is offered in another term.
    SectionNotOffered { section_id: SectionId, term: Term },
    /// No item for this section in the student's record.
    ItemNotFound(SectionId),
    /// Candidate sections break a duplicate or schedule rule.
    Rule(RuleViolation),
    Transition(TransitionError),
    Repo(RepoError),
}

impl EnrollmentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Forbidden(_) | Self::NotAdvisor { .. } => ErrorKind::Forbidden,
            Self::EmptyRequest | Self::SectionNotOffered { .. } => ErrorKind::InvalidInput,
            Self::ItemNotFound(_) => ErrorKind::NotFound,
            Self::Rule(_) => ErrorKind::Conflict,
            Self::Transition(_) => ErrorKind::InvalidTransition,
            Self::Repo(err) => ErrorKind::from(err),
        }
    }
}

impl Display for EnrollmentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Forbidden(err) => write!(f, "{err}"),
            Self::NotAdvisor {
                advisor_id,
                student_id,
            } => write!(
                f,
                "lecturer {advisor_id} is not the advisor of student {student_id}"
            ),
            Self::EmptyRequest => write!(f, "no sections selected"),
            Self::SectionNotOffered { section_id, term } => {
                write!(f, "section {section_id} is not offered in the {term} term")
            }
            Self::ItemNotFound(section_id) => {
                write!(f, "no enrollment item for section {section_id}")
            }
            Self::Rule(err) => write!(f, "{err}"),
            Self::Transition(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EnrollmentError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Forbidden(err) => Some(err),
            Self::Rule(err) => Some(err),
            Self::Transition(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AccessDenied> for EnrollmentError {
    fn from(value: AccessDenied) -> Self {
        Self::Forbidden(value)
    }
}

impl From<RuleViolation> for EnrollmentError {
    fn from(value: RuleViolation) -> Self {
        Self::Rule(value)
    }
}

impl From<TransitionError> for EnrollmentError {
    fn from(value: TransitionError) -> Self {
        Self::Transition(value)
    }
}

impl From<RepoError> for EnrollmentError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{EnrollmentError, ErrorKind};
    use crate::model::enrollment::{ItemStatus, TransitionError, ItemAction};
    use crate::repo::{Entity, RepoError};
    use uuid::Uuid;

    #[test]
    fn repo_errors_map_to_kinds() {
        let id = Uuid::new_v4();
        assert_eq!(
            ErrorKind::from(&RepoError::not_found(Entity::Section, id)),
            ErrorKind::NotFound
        );
        assert_eq!(
            ErrorKind::from(&RepoError::StaleItem {
                item_id: id,
                expected: ItemStatus::Active
            }),
            ErrorKind::Conflict
        );
        assert_eq!(
            ErrorKind::from(&RepoError::Duplicate("x".to_string())),
            ErrorKind::Conflict
        );
        assert_eq!(
            ErrorKind::from(&RepoError::InvalidData("x".to_string())),
            ErrorKind::Storage
        );
    }

    #[test]
    fn transition_errors_keep_their_message() {
        let err = EnrollmentError::from(TransitionError::Item {
            from: ItemStatus::Cancelled,
            action: ItemAction::Approve,
        });
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        assert!(err.to_string().contains("already cancelled"));
    }
}
