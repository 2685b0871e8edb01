use serde::Serialize;

use epiccrm_core::CollaboratorId;

use crate::Role;

/// The decoded identity of the current actor.
///
/// Derived fresh from a validated session token on every command invocation
/// and never persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: CollaboratorId,
    pub email: String,
    pub role: Role,
}

impl Principal {
    pub fn new(id: CollaboratorId, email: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            email: email.into(),
            role,
        }
    }

    pub fn has_role(&self, role: &Role) -> bool {
        &self.role == role
    }
}

impl core::fmt::Display for Principal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} (#{}, {})", self.email, self.id, self.role)
    }
}
