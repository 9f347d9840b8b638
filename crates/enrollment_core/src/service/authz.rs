//! Role guard applied at the top of every mutating workflow.

use crate::model::principal::{Principal, Role, UserId};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Caller's role does not match the operation's required role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDenied {
    pub principal_id: UserId,
    pub actual: Role,
    pub required: Role,
}

impl Display for AccessDenied {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} may not perform a {}-only operation",
            self.actual, self.principal_id, self.required
        )
    }
}

impl Error for AccessDenied {}

/// Succeeds when `principal` holds exactly `required`.
pub fn authorize(principal: &Principal, required: Role) -> Result<(), AccessDenied> {
    if principal.role == required {
        return Ok(());
    }
    Err(AccessDenied {
        principal_id: principal.id,
        actual: principal.role,
        required,
    })
}
