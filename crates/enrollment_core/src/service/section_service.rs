//! Section catalog use-case service.
//!
//! # Responsibility
//! - Admin create/update/delete of class sections.
//! - Open read access to the catalog.
//!
//! # Invariants
//! - Input is validated before the repository is touched.
//! - Updates merge a patch onto the stored section and exclude the section
//!   itself from the room-slot check.

use super::authz::{authorize, AccessDenied};
use super::errors::ErrorKind;
use super::log_outcome;
use crate::clock::Term;
use crate::model::principal::{Principal, Role};
use crate::model::section::{
    NewSection, SectionDetail, SectionId, SectionPatch, SectionValidationError,
};
use crate::repo::section_repo::SectionRepository;
use crate::repo::{Entity, RepoError};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from section catalog operations.
#[derive(Debug)]
pub enum SectionServiceError {
    Forbidden(AccessDenied),
    Validation(SectionValidationError),
    Repo(RepoError),
}

impl SectionServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Validation(_) => ErrorKind::InvalidInput,
            Self::Repo(err) => ErrorKind::from(err),
        }
    }
}

impl Display for SectionServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Forbidden(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SectionServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Forbidden(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<AccessDenied> for SectionServiceError {
    fn from(value: AccessDenied) -> Self {
        Self::Forbidden(value)
    }
}

impl From<SectionValidationError> for SectionServiceError {
    fn from(value: SectionValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for SectionServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

pub type SectionResult<T> = Result<T, SectionServiceError>;

/// Section catalog facade over repository implementations.
pub struct SectionService<R: SectionRepository> {
    repo: R,
}

impl<R: SectionRepository> SectionService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a section unless its room is booked for an overlapping window
    /// on the same day and term.
    pub fn create_section(
        &self,
        principal: &Principal,
        input: NewSection,
    ) -> SectionResult<SectionDetail> {
        let fields = format!("room_id={} weekday={}", input.room_id, input.weekday);
        let result = authorize(principal, Role::Admin)
            .map_err(SectionServiceError::from)
            .and_then(|()| input.into_section().map_err(SectionServiceError::from))
            .and_then(|section| {
                self.repo
                    .insert_section(&section)
                    .map_err(SectionServiceError::from)
            });
        log_outcome(
            "section_create",
            "section_service",
            &fields,
            &result,
            SectionServiceError::kind,
        );
        result
    }

    /// Merges `patch` onto the stored section and saves it.
    pub fn update_section(
        &self,
        principal: &Principal,
        id: SectionId,
        patch: SectionPatch,
    ) -> SectionResult<SectionDetail> {
        let result = self.update_section_inner(principal, id, patch);
        log_outcome(
            "section_update",
            "section_service",
            &format!("section_id={id}"),
            &result,
            SectionServiceError::kind,
        );
        result
    }

    fn update_section_inner(
        &self,
        principal: &Principal,
        id: SectionId,
        patch: SectionPatch,
    ) -> SectionResult<SectionDetail> {
        authorize(principal, Role::Admin)?;
        let current = self
            .repo
            .get_section(id)?
            .ok_or(RepoError::not_found(Entity::Section, id))?;
        let merged = patch.apply_to(&current.section)?;
        Ok(self.repo.update_section(&merged)?)
    }

    /// Deletes a section no enrollment item references.
    pub fn delete_section(&self, principal: &Principal, id: SectionId) -> SectionResult<()> {
        let result = authorize(principal, Role::Admin)
            .map_err(SectionServiceError::from)
            .and_then(|()| self.repo.delete_section(id).map_err(SectionServiceError::from));
        log_outcome(
            "section_delete",
            "section_service",
            &format!("section_id={id}"),
            &result,
            SectionServiceError::kind,
        );
        result
    }

    pub fn get_section(&self, id: SectionId) -> SectionResult<SectionDetail> {
        self.repo
            .get_section(id)?
            .ok_or(SectionServiceError::Repo(RepoError::not_found(Entity::Section, id)))
    }

    /// Lists sections ordered by course code and label, optionally for one
    /// term.
    pub fn list_sections(&self, term: Option<Term>) -> SectionResult<Vec<SectionDetail>> {
        Ok(self.repo.list_sections(term)?)
    }
}
