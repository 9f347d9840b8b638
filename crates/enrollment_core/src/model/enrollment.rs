//! Enrollment records, items and their state machine.
//!
//! # Responsibility
//! - Define the term registration aggregate and its line items.
//! - Hold the only transition table for record and item statuses.
//!
//! # Invariants
//! - A record is `Draft` until the first advisor approve/reject, then
//!   `Verified` for good.
//! - `Cancelled` and `Rejected` items are terminal and ignored by every
//!   duplicate and schedule check.
//! - Transitions not listed in `next_item_status` are rejected.

use crate::clock::Term;
use crate::model::catalog::UserProfile;
use crate::model::section::{SectionDetail, SectionId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RecordId = Uuid;
pub type ItemId = Uuid;

/// Term registration status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Student may add and drop freely.
    Draft,
    /// At least one item was reviewed by the advisor.
    Verified,
}

/// Line item status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Active,
    CancellationRequested,
    Cancelled,
    Approved,
    Rejected,
}

impl ItemStatus {
    /// Terminal items no longer hold a seat in the student's schedule.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Rejected)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::CancellationRequested => "cancellation_requested",
            Self::Cancelled => "cancelled",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "cancellation_requested" => Some(Self::CancellationRequested),
            "cancelled" => Some(Self::Cancelled),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl Display for ItemStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RecordStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Verified => "verified",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "verified" => Some(Self::Verified),
            _ => None,
        }
    }

    /// Checks whether a student-initiated action is legal in this status.
    pub fn ensure_allows(self, action: StudentAction) -> Result<(), TransitionError> {
        let allowed = match action {
            StudentAction::Enroll | StudentAction::Drop => self == Self::Draft,
            StudentAction::RequestCancellation => self == Self::Verified,
        };
        if allowed {
            Ok(())
        } else {
            Err(TransitionError::Record {
                status: self,
                action,
            })
        }
    }
}

impl Display for RecordStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record-level operations a student may attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentAction {
    Enroll,
    Drop,
    RequestCancellation,
}

/// Item-level transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemAction {
    RequestCancellation,
    Approve,
    Reject,
    ConfirmCancellation,
    Reassign,
}

impl Display for ItemAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::RequestCancellation => "request cancellation",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::ConfirmCancellation => "confirm cancellation",
            Self::Reassign => "reassign",
        };
        f.write_str(name)
    }
}

/// Attempted transition is not in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    Record {
        status: RecordStatus,
        action: StudentAction,
    },
    Item {
        from: ItemStatus,
        action: ItemAction,
    },
}

impl Display for TransitionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Record {
                status: RecordStatus::Verified,
                action: StudentAction::Drop,
            } => write!(
                f,
                "registration is already verified; request a cancellation instead of dropping"
            ),
            Self::Record {
                status: RecordStatus::Verified,
                action: StudentAction::Enroll,
            } => write!(f, "registration is already verified; no sections can be added"),
            Self::Record {
                status: RecordStatus::Draft,
                action: StudentAction::RequestCancellation,
            } => write!(
                f,
                "registration is not verified yet; drop the section instead"
            ),
            Self::Record { status, action } => {
                write!(f, "{action:?} is not allowed on a {status} registration")
            }
            Self::Item {
                from: ItemStatus::CancellationRequested,
                action: ItemAction::RequestCancellation,
            } => write!(f, "cancellation was already requested for this section"),
            Self::Item {
                from: ItemStatus::Cancelled,
                action,
            } => write!(f, "cannot {action}: section was already cancelled"),
            Self::Item {
                from: ItemStatus::Rejected,
                action: ItemAction::RequestCancellation,
            } => write!(f, "section was rejected by the advisor"),
            Self::Item { from, action } => {
                write!(f, "cannot {action} a section in status {from}")
            }
        }
    }
}

impl Error for TransitionError {}

/// Item transition table.
pub fn next_item_status(from: ItemStatus, action: ItemAction) -> Result<ItemStatus, TransitionError> {
    use ItemAction as A;
    use ItemStatus as S;

    let next = match (from, action) {
        (S::Active, A::RequestCancellation) => S::CancellationRequested,
        (S::Active | S::CancellationRequested | S::Rejected, A::Approve) => S::Approved,
        (S::Active | S::CancellationRequested | S::Approved, A::Reject) => S::Rejected,
        (S::CancellationRequested, A::ConfirmCancellation) => S::Cancelled,
        (S::Active | S::CancellationRequested | S::Approved | S::Rejected, A::Reassign) => {
            S::Active
        }
        _ => return Err(TransitionError::Item { from, action }),
    };
    Ok(next)
}

/// One selected section inside a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentItem {
    pub id: ItemId,
    /// Owning record; lookup key only.
    pub record_id: RecordId,
    pub section: SectionDetail,
    pub status: ItemStatus,
    /// Epoch ms.
    pub created_at: i64,
    pub cancellation_requested_at: Option<i64>,
    pub cancelled_at: Option<i64>,
}

impl EnrollmentItem {
    pub fn section_id(&self) -> SectionId {
        self.section.id()
    }

    pub fn is_live(&self) -> bool {
        !self.status.is_terminal()
    }
}

/// A student's registration for one term, hydrated with all items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub id: RecordId,
    /// Student profile, including the assigned advisor.
    pub student: UserProfile,
    pub term: Term,
    pub status: RecordStatus,
    pub advisor_note: String,
    /// Epoch ms.
    pub created_at: i64,
    /// Epoch ms of the latest advisor review.
    pub verified_at: Option<i64>,
    pub items: BTreeMap<ItemId, EnrollmentItem>,
}

impl EnrollmentRecord {
    /// Items still holding a seat (not cancelled or rejected).
    pub fn live_items(&self) -> impl Iterator<Item = &EnrollmentItem> {
        self.items.values().filter(|item| item.is_live())
    }

    /// Item for `section_id`, preferring a live one over terminal history.
    pub fn item_for_section(&self, section_id: SectionId) -> Option<&EnrollmentItem> {
        let mut fallback: Option<&EnrollmentItem> = None;
        for item in self.items.values().filter(|item| item.section_id() == section_id) {
            if item.is_live() {
                return Some(item);
            }
            if fallback.map_or(true, |current| item.created_at >= current.created_at) {
                fallback = Some(item);
            }
        }
        fallback
    }

    /// Item holding exactly `status` for `section_id`.
    pub fn item_with_status(
        &self,
        section_id: SectionId,
        status: ItemStatus,
    ) -> Option<&EnrollmentItem> {
        self.items
            .values()
            .find(|item| item.section_id() == section_id && item.status == status)
    }

    pub fn holds_live_section(&self, section_id: SectionId) -> bool {
        self.live_items().any(|item| item.section_id() == section_id)
    }

    pub fn is_verified(&self) -> bool {
        self.status == RecordStatus::Verified
    }
}

#[cfg(test)]
mod tests {
    use super::{next_item_status, ItemAction, ItemStatus, RecordStatus, StudentAction, TransitionError};

    const ALL_STATUSES: [ItemStatus; 5] = [
        ItemStatus::Active,
        ItemStatus::CancellationRequested,
        ItemStatus::Cancelled,
        ItemStatus::Approved,
        ItemStatus::Rejected,
    ];

    #[test]
    fn request_cancellation_only_from_active() {
        for from in ALL_STATUSES {
            let result = next_item_status(from, ItemAction::RequestCancellation);
            if from == ItemStatus::Active {
                assert_eq!(result, Ok(ItemStatus::CancellationRequested));
            } else {
                assert_eq!(
                    result,
                    Err(TransitionError::Item {
                        from,
                        action: ItemAction::RequestCancellation
                    })
                );
            }
        }
    }

    #[test]
    fn approve_and_reject_reject_cancelled_and_same_status() {
        assert!(next_item_status(ItemStatus::Cancelled, ItemAction::Approve).is_err());
        assert!(next_item_status(ItemStatus::Cancelled, ItemAction::Reject).is_err());
        assert!(next_item_status(ItemStatus::Approved, ItemAction::Approve).is_err());
        assert!(next_item_status(ItemStatus::Rejected, ItemAction::Reject).is_err());
        assert_eq!(
            next_item_status(ItemStatus::Approved, ItemAction::Reject),
            Ok(ItemStatus::Rejected)
        );
        assert_eq!(
            next_item_status(ItemStatus::Rejected, ItemAction::Approve),
            Ok(ItemStatus::Approved)
        );
    }

    #[test]
    fn confirm_cancellation_needs_pending_request() {
        assert_eq!(
            next_item_status(ItemStatus::CancellationRequested, ItemAction::ConfirmCancellation),
            Ok(ItemStatus::Cancelled)
        );
        for from in [ItemStatus::Active, ItemStatus::Approved, ItemStatus::Cancelled] {
            assert!(next_item_status(from, ItemAction::ConfirmCancellation).is_err());
        }
    }

    #[test]
    fn reassign_resets_everything_but_cancelled() {
        for from in ALL_STATUSES {
            let result = next_item_status(from, ItemAction::Reassign);
            if from == ItemStatus::Cancelled {
                assert!(result.is_err());
            } else {
                assert_eq!(result, Ok(ItemStatus::Active));
            }
        }
    }

    #[test]
    fn record_gates_student_actions() {
        assert!(RecordStatus::Draft.ensure_allows(StudentAction::Enroll).is_ok());
        assert!(RecordStatus::Draft.ensure_allows(StudentAction::Drop).is_ok());
        assert!(RecordStatus::Draft
            .ensure_allows(StudentAction::RequestCancellation)
            .is_err());
        assert!(RecordStatus::Verified.ensure_allows(StudentAction::Drop).is_err());
        assert!(RecordStatus::Verified.ensure_allows(StudentAction::Enroll).is_err());
        assert!(RecordStatus::Verified
            .ensure_allows(StudentAction::RequestCancellation)
            .is_ok());
    }

    #[test]
    fn terminal_statuses() {
        let terminal: Vec<_> = ALL_STATUSES.into_iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(terminal, vec![ItemStatus::Cancelled, ItemStatus::Rejected]);
    }

    #[test]
    fn status_labels_round_trip() {
        for status in ALL_STATUSES {
            assert_eq!(ItemStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RecordStatus::parse("verified"), Some(RecordStatus::Verified));
        assert_eq!(RecordStatus::parse("VERIFIED"), None);
    }

    #[test]
    fn specific_messages_for_cancellation_failures() {
        let requested = TransitionError::Item {
            from: ItemStatus::CancellationRequested,
            action: ItemAction::RequestCancellation,
        };
        let cancelled = TransitionError::Item {
            from: ItemStatus::Cancelled,
            action: ItemAction::RequestCancellation,
        };
        let rejected = TransitionError::Item {
            from: ItemStatus::Rejected,
            action: ItemAction::RequestCancellation,
        };
        assert!(requested.to_string().contains("already requested"));
        assert!(cancelled.to_string().contains("already cancelled"));
        assert!(rejected.to_string().contains("rejected"));
    }
}
