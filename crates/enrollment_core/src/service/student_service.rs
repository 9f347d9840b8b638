//! Student enrollment workflow.
//!
//! # Responsibility
//! - Enroll, drop and request cancellation on the caller's current-term
//!   record.
//! - List sections the student can still pick.
//!
//! # Invariants
//! - The student is always the principal; no operation accepts a student id.
//! - Enroll and drop need a `Draft` record, cancellation requests a
//!   `Verified` one.
//! - An enroll request is all or nothing, and its checks run on the record
//!   read inside the transaction that writes the items.

use super::authz::authorize;
use super::errors::EnrollmentError;
use super::log_outcome;
use super::rules::check_candidates;
use crate::clock::{Clock, Term};
use crate::model::enrollment::{
    next_item_status, EnrollmentRecord, ItemAction, ItemStatus, StudentAction,
};
use crate::model::principal::{Principal, Role};
use crate::model::section::{SectionDetail, SectionId};
use crate::repo::enrollment_repo::{EnrollmentRepository, ItemChange};
use std::collections::HashSet;

pub type EnrollmentResult<T> = Result<T, EnrollmentError>;

/// Student workflow facade over an enrollment repository.
pub struct StudentService<R: EnrollmentRepository, C: Clock> {
    repo: R,
    clock: C,
}

impl<R: EnrollmentRepository, C: Clock> StudentService<R, C> {
    pub fn new(repo: R, clock: C) -> Self {
        Self { repo, clock }
    }

    /// Adds one `Active` item per requested section.
    ///
    /// Fails without writing if the request is empty, any section is unknown
    /// or offered in another term, or the resulting schedule breaks a
    /// duplicate or overlap rule.
    pub fn enroll(
        &self,
        principal: &Principal,
        section_ids: &[SectionId],
    ) -> EnrollmentResult<EnrollmentRecord> {
        let result = self.enroll_inner(principal, section_ids);
        log_outcome(
            "enroll",
            "student_service",
            &format!("student_id={} sections={}", principal.id, section_ids.len()),
            &result,
            EnrollmentError::kind,
        );
        result
    }

    fn enroll_inner(
        &self,
        principal: &Principal,
        section_ids: &[SectionId],
    ) -> EnrollmentResult<EnrollmentRecord> {
        authorize(principal, Role::Student)?;
        if section_ids.is_empty() {
            return Err(EnrollmentError::EmptyRequest);
        }
        let record = self.current_record(principal)?;
        self.repo.insert_items(
            record.id,
            section_ids,
            self.clock.now_epoch_ms(),
            admit_enrollment,
        )?;
        self.current_record(principal)
    }

    /// Deletes the student's `Active` item for `section_id` while the record
    /// is still a draft.
    pub fn drop(
        &self,
        principal: &Principal,
        section_id: SectionId,
    ) -> EnrollmentResult<EnrollmentRecord> {
        let result = self.drop_inner(principal, section_id);
        log_outcome(
            "drop",
            "student_service",
            &format!("student_id={} section_id={section_id}", principal.id),
            &result,
            EnrollmentError::kind,
        );
        result
    }

    fn drop_inner(
        &self,
        principal: &Principal,
        section_id: SectionId,
    ) -> EnrollmentResult<EnrollmentRecord> {
        authorize(principal, Role::Student)?;
        let record = self.current_record(principal)?;
        record.status.ensure_allows(StudentAction::Drop)?;

        let item = record
            .item_with_status(section_id, ItemStatus::Active)
            .ok_or(EnrollmentError::ItemNotFound(section_id))?;
        self.repo.delete_item(item.id, Some(ItemStatus::Active))?;
        self.current_record(principal)
    }

    /// Asks the advisor to cancel an `Active` item on a verified record.
    pub fn request_cancellation(
        &self,
        principal: &Principal,
        section_id: SectionId,
    ) -> EnrollmentResult<EnrollmentRecord> {
        let result = self.request_cancellation_inner(principal, section_id);
        log_outcome(
            "request_cancellation",
            "student_service",
            &format!("student_id={} section_id={section_id}", principal.id),
            &result,
            EnrollmentError::kind,
        );
        result
    }

    fn request_cancellation_inner(
        &self,
        principal: &Principal,
        section_id: SectionId,
    ) -> EnrollmentResult<EnrollmentRecord> {
        authorize(principal, Role::Student)?;
        let record = self.current_record(principal)?;
        record
            .status
            .ensure_allows(StudentAction::RequestCancellation)?;

        let item = record
            .item_for_section(section_id)
            .ok_or(EnrollmentError::ItemNotFound(section_id))?;
        let next = next_item_status(item.status, ItemAction::RequestCancellation)?;
        self.repo.transition_item(&ItemChange {
            item_id: item.id,
            expected: item.status,
            next,
            at: self.clock.now_epoch_ms(),
        })?;
        self.current_record(principal)
    }

    /// Current-term sections whose id the student does not hold live.
    pub fn list_available(&self, principal: &Principal) -> EnrollmentResult<Vec<SectionDetail>> {
        authorize(principal, Role::Student)?;
        let record = self.current_record(principal)?;
        let held: HashSet<SectionId> = record.live_items().map(|item| item.section_id()).collect();
        Ok(self.repo.offered_sections(record.term, &held)?)
    }

    /// The caller's hydrated current-term record.
    pub fn taken(&self, principal: &Principal) -> EnrollmentResult<EnrollmentRecord> {
        authorize(principal, Role::Student)?;
        self.current_record(principal)
    }

    fn current_record(&self, principal: &Principal) -> EnrollmentResult<EnrollmentRecord> {
        let term = Term::current(&self.clock);
        Ok(self
            .repo
            .get_or_create_record(principal.id, term, self.clock.now_epoch_ms())?)
    }
}

/// Admission rules for an enroll request, evaluated against the record as it
/// stands inside the inserting transaction.
pub fn admit_enrollment(
    record: &EnrollmentRecord,
    requested: &[SectionDetail],
) -> EnrollmentResult<()> {
    record.status.ensure_allows(StudentAction::Enroll)?;
    if let Some(foreign) = requested
        .iter()
        .find(|detail| detail.section.term != record.term)
    {
        return Err(EnrollmentError::SectionNotOffered {
            section_id: foreign.id(),
            term: record.term,
        });
    }

    let held: Vec<&SectionDetail> = record.live_items().map(|item| &item.section).collect();
    let candidates: Vec<&SectionDetail> = requested.iter().collect();
    check_candidates(&held, &candidates)?;
    Ok(())
}
