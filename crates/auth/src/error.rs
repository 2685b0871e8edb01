//! Failures of the authentication/authorization core.
//!
//! Every variant is terminal for the invoking command; nothing here is
//! retried. The CLI maps each kind to its own message and exit status.

use thiserror::Error;

use crate::{Action, OwnershipDenial, PasswordError, Resource};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("no active session: please log in first")]
    NoSession,

    #[error("your session has expired: please log in again")]
    ExpiredSession,

    #[error("invalid session token: please log in again")]
    InvalidToken,

    /// Unknown email and wrong password collapse into this one message.
    #[error("invalid email or password")]
    Authentication,

    #[error(transparent)]
    PermissionDenied(#[from] AuthzError),

    #[error("credential lookup failed: {0}")]
    Credentials(String),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("session file error: {0}")]
    SessionFile(String),

    #[error("auth configuration error: {0}")]
    Configuration(String),
}

/// Role-level or row-level denial.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("permission denied: role '{role}' may not {action} {resource}")]
    Forbidden {
        role: String,
        resource: Resource,
        action: Action,
    },

    #[error("permission denied: {0}")]
    Ownership(#[from] OwnershipDenial),
}

impl AuthError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, AuthError::PermissionDenied(_))
    }
}
