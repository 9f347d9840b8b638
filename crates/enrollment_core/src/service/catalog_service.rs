//! Reference data administration.
//!
//! # Responsibility
//! - Admin registration of users, courses and rooms.
//! - Advisor assignment for students.
//!
//! # Invariants
//! - Names, codes and emails are normalized by the model constructors
//!   before they reach storage.
//! - Advisors are lecturers; the repository re-checks this on write.

use super::authz::{authorize, AccessDenied};
use super::errors::ErrorKind;
use super::log_outcome;
use crate::model::catalog::{CatalogValidationError, Course, Room, UserProfile};
use crate::model::principal::{Principal, Role, UserId};
use crate::repo::catalog_repo::CatalogRepository;
use crate::repo::{Entity, RepoError};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from reference data operations.
#[derive(Debug)]
pub enum CatalogError {
    Forbidden(AccessDenied),
    Validation(CatalogValidationError),
    Repo(RepoError),
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Validation(_) => ErrorKind::InvalidInput,
            Self::Repo(RepoError::InvalidData(_)) => ErrorKind::InvalidInput,
            Self::Repo(err) => ErrorKind::from(err),
        }
    }
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Forbidden(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CatalogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Forbidden(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<AccessDenied> for CatalogError {
    fn from(value: AccessDenied) -> Self {
        Self::Forbidden(value)
    }
}

impl From<CatalogValidationError> for CatalogError {
    fn from(value: CatalogValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for CatalogError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Admin input for a new directory user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub student_number: Option<String>,
    pub advisor_id: Option<UserId>,
}

/// Reference data facade over repository implementations.
pub struct CatalogService<R: CatalogRepository> {
    repo: R,
}

impl<R: CatalogRepository> CatalogService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_user(&self, principal: &Principal, input: NewUser) -> CatalogResult<UserProfile> {
        let fields = format!("role={}", input.role);
        let result = self.create_user_inner(principal, input);
        log_outcome("user_create", "catalog_service", &fields, &result, CatalogError::kind);
        result
    }

    fn create_user_inner(&self, principal: &Principal, input: NewUser) -> CatalogResult<UserProfile> {
        authorize(principal, Role::Admin)?;
        let mut user = UserProfile::new(&input.name, &input.email, input.role)?;
        if let Some(number) = input.student_number.as_deref() {
            user = user.with_student_number(number);
        }
        if let Some(advisor_id) = input.advisor_id {
            user = user.with_advisor(advisor_id)?;
        }
        self.repo.create_user(&user)?;
        Ok(user)
    }

    /// Points a student at a lecturer advisor, or clears it with `None`.
    pub fn assign_advisor(
        &self,
        principal: &Principal,
        student_id: UserId,
        advisor_id: Option<UserId>,
    ) -> CatalogResult<UserProfile> {
        let result = self.assign_advisor_inner(principal, student_id, advisor_id);
        log_outcome(
            "advisor_assign",
            "catalog_service",
            &format!("student_id={student_id}"),
            &result,
            CatalogError::kind,
        );
        result
    }

    fn assign_advisor_inner(
        &self,
        principal: &Principal,
        student_id: UserId,
        advisor_id: Option<UserId>,
    ) -> CatalogResult<UserProfile> {
        authorize(principal, Role::Admin)?;
        self.repo.assign_advisor(student_id, advisor_id)?;
        self.get_user(student_id)
    }

    pub fn get_user(&self, id: UserId) -> CatalogResult<UserProfile> {
        self.repo
            .get_user(id)?
            .ok_or(CatalogError::Repo(RepoError::not_found(Entity::User, id)))
    }

    pub fn create_course(
        &self,
        principal: &Principal,
        code: &str,
        name: &str,
        credits: u32,
    ) -> CatalogResult<Course> {
        let result = authorize(principal, Role::Admin)
            .map_err(CatalogError::from)
            .and_then(|()| Course::new(code, name, credits).map_err(CatalogError::from))
            .and_then(|course| {
                self.repo.create_course(&course)?;
                Ok(course)
            });
        log_outcome(
            "course_create",
            "catalog_service",
            &format!("code={}", code.trim()),
            &result,
            CatalogError::kind,
        );
        result
    }

    pub fn create_room(&self, principal: &Principal, name: &str) -> CatalogResult<Room> {
        let result = authorize(principal, Role::Admin)
            .map_err(CatalogError::from)
            .and_then(|()| Room::new(name).map_err(CatalogError::from))
            .and_then(|room| {
                self.repo.create_room(&room)?;
                Ok(room)
            });
        log_outcome(
            "room_create",
            "catalog_service",
            &format!("room={:?}", name.trim()),
            &result,
            CatalogError::kind,
        );
        result
    }
}
