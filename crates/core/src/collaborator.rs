//! Collaborators: staff members who log in and act on CRM records.

use serde::{Deserialize, Serialize};

use crate::error::DomainResult;
use crate::value_object::non_empty;
use crate::{CollaboratorId, Email, Entity, RoleId};

/// A stored collaborator.
///
/// `password_hash` is a PHC string produced by the auth crate; this crate
/// never sees a cleartext password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborator {
    pub id: CollaboratorId,
    pub name: String,
    pub email: Email,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role_id: RoleId,
    pub role_name: String,
}

impl Entity for Collaborator {
    type Id = CollaboratorId;

    fn id(&self) -> CollaboratorId {
        self.id
    }
}

/// Validated input for creating a collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCollaborator {
    pub name: String,
    pub email: Email,
    pub password_hash: String,
    pub role_name: String,
}

impl NewCollaborator {
    pub fn new(
        name: &str,
        email: &str,
        password_hash: impl Into<String>,
        role_name: &str,
    ) -> DomainResult<Self> {
        Ok(Self {
            name: non_empty("name", name)?,
            email: Email::parse(email)?,
            password_hash: non_empty("password hash", &password_hash.into())?,
            role_name: non_empty("role", role_name)?,
        })
    }
}

/// Partial update of a collaborator. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollaboratorPatch {
    pub name: Option<String>,
    pub email: Option<Email>,
    pub password_hash: Option<String>,
    pub role_name: Option<String>,
}

impl CollaboratorPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.password_hash.is_none()
            && self.role_name.is_none()
    }

    /// Apply the patch. Role changes are resolved by the store, which owns the
    /// name → role id mapping.
    pub fn apply(&self, target: &mut Collaborator) -> DomainResult<()> {
        if let Some(name) = &self.name {
            target.name = non_empty("name", name)?;
        }
        if let Some(email) = &self.email {
            target.email = email.clone();
        }
        if let Some(hash) = &self.password_hash {
            target.password_hash = non_empty("password hash", hash)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Collaborator {
        Collaborator {
            id: CollaboratorId::new(1),
            name: "Alice Dupont".to_string(),
            email: Email::parse("alice.dupont@example.com").unwrap(),
            password_hash: "$argon2id$stub".to_string(),
            role_id: RoleId::new(2),
            role_name: "commercial".to_string(),
        }
    }

    #[test]
    fn new_collaborator_validates_fields() {
        assert!(NewCollaborator::new("Alice", "alice@example.com", "hash", "commercial").is_ok());
        assert!(NewCollaborator::new("  ", "alice@example.com", "hash", "commercial").is_err());
        assert!(NewCollaborator::new("Alice", "alice", "hash", "commercial").is_err());
        assert!(NewCollaborator::new("Alice", "alice@example.com", "hash", "").is_err());
    }

    #[test]
    fn patch_updates_only_given_fields() {
        let mut collab = alice();
        let patch = CollaboratorPatch {
            name: Some("Alice Martin".to_string()),
            ..Default::default()
        };
        patch.apply(&mut collab).unwrap();

        assert_eq!(collab.name, "Alice Martin");
        assert_eq!(collab.email.as_str(), "alice.dupont@example.com");
    }

    #[test]
    fn serialized_collaborator_omits_password_hash() {
        let json = serde_json::to_value(alice()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role_name"], "commercial");
    }
}
