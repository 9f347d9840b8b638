//! Academic advisor workflow.
//!
//! # Responsibility
//! - Review (approve/reject) advisees' items and verify their records.
//! - Remove, reassign and confirm cancellation of advisee items.
//!
//! # Invariants
//! - Every operation first loads the student's current-term record and
//!   checks the caller is that student's advisor. A mismatch is
//!   `Forbidden`, never `NotFound`.
//! - Approve/reject flips the record to `Verified` in the same transaction
//!   as the item change.
//! - Reassign and approve-from-rejected re-run the student-side rules
//!   against every other live item before writing.

use super::authz::authorize;
use super::errors::EnrollmentError;
use super::log_outcome;
use super::rules::check_candidates;
use super::student_service::EnrollmentResult;
use crate::clock::{Clock, Term};
use crate::model::catalog::UserProfile;
use crate::model::enrollment::{
    next_item_status, EnrollmentItem, EnrollmentRecord, ItemAction, ItemStatus,
};
use crate::model::principal::{Principal, Role, UserId};
use crate::model::section::{SectionDetail, SectionId};
use crate::repo::enrollment_repo::{EnrollmentRepository, ItemChange};
use crate::repo::{Entity, RepoError};

/// Advisor workflow facade over an enrollment repository.
pub struct AdvisorService<R: EnrollmentRepository, C: Clock> {
    repo: R,
    clock: C,
}

impl<R: EnrollmentRepository, C: Clock> AdvisorService<R, C> {
    pub fn new(repo: R, clock: C) -> Self {
        Self { repo, clock }
    }

    /// Students assigned to the calling lecturer.
    pub fn list_advisees(&self, principal: &Principal) -> EnrollmentResult<Vec<UserProfile>> {
        authorize(principal, Role::Lecturer)?;
        Ok(self.repo.list_advisees(principal.id)?)
    }

    pub fn view_record(
        &self,
        principal: &Principal,
        student_id: UserId,
    ) -> EnrollmentResult<EnrollmentRecord> {
        self.advisee_record(principal, student_id)
    }

    /// Deletes the student's item for `section_id` whatever its status.
    pub fn remove_item(
        &self,
        principal: &Principal,
        student_id: UserId,
        section_id: SectionId,
    ) -> EnrollmentResult<EnrollmentRecord> {
        let result = (|| -> EnrollmentResult<EnrollmentRecord> {
            let record = self.advisee_record(principal, student_id)?;
            let item = find_item(&record, section_id)?;
            self.repo.delete_item(item.id, None)?;
            self.reload(student_id)
        })();
        self.log("advisor_remove_item", principal, student_id, section_id, &result);
        result
    }

    /// Moves the student's item from `old_section_id` to `new_section_id`
    /// and resets it to `Active`.
    pub fn reassign_item(
        &self,
        principal: &Principal,
        student_id: UserId,
        old_section_id: SectionId,
        new_section_id: SectionId,
    ) -> EnrollmentResult<EnrollmentRecord> {
        let result = (|| -> EnrollmentResult<EnrollmentRecord> {
            let record = self.advisee_record(principal, student_id)?;
            let item = find_item(&record, old_section_id)?;
            next_item_status(item.status, ItemAction::Reassign)?;

            let target = self
                .repo
                .sections_by_ids(&[new_section_id])?
                .into_iter()
                .next()
                .ok_or(RepoError::not_found(Entity::Section, new_section_id))?;
            if target.section.term != record.term {
                return Err(EnrollmentError::SectionNotOffered {
                    section_id: new_section_id,
                    term: record.term,
                });
            }
            check_candidates(&other_live_sections(&record, item), &[&target])?;

            self.repo
                .reassign_item(item.id, item.status, new_section_id)?;
            self.reload(student_id)
        })();
        self.log(
            "advisor_reassign_item",
            principal,
            student_id,
            old_section_id,
            &result,
        );
        result
    }

    pub fn approve(
        &self,
        principal: &Principal,
        student_id: UserId,
        section_id: SectionId,
    ) -> EnrollmentResult<EnrollmentRecord> {
        let result = self.review(principal, student_id, section_id, ItemAction::Approve);
        self.log("advisor_approve", principal, student_id, section_id, &result);
        result
    }

    pub fn reject(
        &self,
        principal: &Principal,
        student_id: UserId,
        section_id: SectionId,
    ) -> EnrollmentResult<EnrollmentRecord> {
        let result = self.review(principal, student_id, section_id, ItemAction::Reject);
        self.log("advisor_reject", principal, student_id, section_id, &result);
        result
    }

    /// Completes a pending cancellation request. The record status is left
    /// as is.
    pub fn confirm_cancellation(
        &self,
        principal: &Principal,
        student_id: UserId,
        section_id: SectionId,
    ) -> EnrollmentResult<EnrollmentRecord> {
        let result = (|| -> EnrollmentResult<EnrollmentRecord> {
            let record = self.advisee_record(principal, student_id)?;
            let item = find_item(&record, section_id)?;
            let next = next_item_status(item.status, ItemAction::ConfirmCancellation)?;
            self.repo.transition_item(&ItemChange {
                item_id: item.id,
                expected: item.status,
                next,
                at: self.clock.now_epoch_ms(),
            })?;
            self.reload(student_id)
        })();
        self.log(
            "advisor_confirm_cancellation",
            principal,
            student_id,
            section_id,
            &result,
        );
        result
    }

    /// Replaces the advisor's free-text note on the record.
    pub fn annotate(
        &self,
        principal: &Principal,
        student_id: UserId,
        note: &str,
    ) -> EnrollmentResult<EnrollmentRecord> {
        let result = (|| -> EnrollmentResult<EnrollmentRecord> {
            let record = self.advisee_record(principal, student_id)?;
            self.repo.set_advisor_note(record.id, note.trim())?;
            self.reload(student_id)
        })();
        log_outcome(
            "advisor_annotate",
            "advisor_service",
            &format!("advisor_id={} student_id={student_id}", principal.id),
            &result,
            EnrollmentError::kind,
        );
        result
    }

    fn review(
        &self,
        principal: &Principal,
        student_id: UserId,
        section_id: SectionId,
        action: ItemAction,
    ) -> EnrollmentResult<EnrollmentRecord> {
        let record = self.advisee_record(principal, student_id)?;
        let item = find_item(&record, section_id)?;
        let next = next_item_status(item.status, action)?;
        if item.status == ItemStatus::Rejected {
            check_candidates(&other_live_sections(&record, item), &[&item.section])?;
        }

        self.repo.review_item(
            record.id,
            &ItemChange {
                item_id: item.id,
                expected: item.status,
                next,
                at: self.clock.now_epoch_ms(),
            },
        )?;
        self.reload(student_id)
    }

    fn advisee_record(
        &self,
        principal: &Principal,
        student_id: UserId,
    ) -> EnrollmentResult<EnrollmentRecord> {
        authorize(principal, Role::Lecturer)?;
        let record = self.reload(student_id)?;
        if !record.student.is_advised_by(principal.id) {
            return Err(EnrollmentError::NotAdvisor {
                advisor_id: principal.id,
                student_id,
            });
        }
        Ok(record)
    }

    fn reload(&self, student_id: UserId) -> EnrollmentResult<EnrollmentRecord> {
        let term = Term::current(&self.clock);
        Ok(self
            .repo
            .get_or_create_record(student_id, term, self.clock.now_epoch_ms())?)
    }

    fn log(
        &self,
        event: &'static str,
        principal: &Principal,
        student_id: UserId,
        section_id: SectionId,
        result: &EnrollmentResult<EnrollmentRecord>,
    ) {
        log_outcome(
            event,
            "advisor_service",
            &format!(
                "advisor_id={} student_id={student_id} section_id={section_id}",
                principal.id
            ),
            result,
            EnrollmentError::kind,
        );
    }
}

fn find_item(record: &EnrollmentRecord, section_id: SectionId) -> EnrollmentResult<&EnrollmentItem> {
    record
        .item_for_section(section_id)
        .ok_or(EnrollmentError::ItemNotFound(section_id))
}

/// Sections of every live item except `item`.
fn other_live_sections<'a>(
    record: &'a EnrollmentRecord,
    item: &EnrollmentItem,
) -> Vec<&'a SectionDetail> {
    record
        .live_items()
        .filter(|other| other.id != item.id)
        .map(|other| &other.section)
        .collect()
}
