//! Resource and action vocabulary.
//!
//! Both sets are closed: an unknown resource or action name is a parse error
//! at the edge, never a silent empty lookup deeper in the policy.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A kind of CRM record subject to access control.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Collaborator,
    Client,
    Contract,
    Event,
    Role,
}

impl Resource {
    pub const ALL: [Resource; 5] = [
        Resource::Collaborator,
        Resource::Client,
        Resource::Contract,
        Resource::Event,
        Resource::Role,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Collaborator => "collaborator",
            Resource::Client => "client",
            Resource::Contract => "contract",
            Resource::Event => "event",
            Resource::Role => "role",
        }
    }
}

/// Something a principal can do to a resource.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Read, Action::Create, Action::Update, Action::Delete];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl core::fmt::Display for Resource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PermissionParseError {
    #[error("unknown resource '{0}' (expected one of: collaborator, client, contract, event, role)")]
    UnknownResource(String),

    #[error("unknown action '{0}' (expected one of: read, create, update, delete)")]
    UnknownAction(String),

    #[error("malformed permission '{0}' (expected '<resource>.<action>')")]
    Malformed(String),
}

impl FromStr for Resource {
    type Err = PermissionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Table names are accepted too, so `db read clients` works.
        match s.trim().to_ascii_lowercase().as_str() {
            "collaborator" | "collaborators" => Ok(Resource::Collaborator),
            "client" | "clients" => Ok(Resource::Client),
            "contract" | "contracts" => Ok(Resource::Contract),
            "event" | "events" => Ok(Resource::Event),
            "role" | "roles" => Ok(Resource::Role),
            _ => Err(PermissionParseError::UnknownResource(s.to_string())),
        }
    }
}

impl FromStr for Action {
    type Err = PermissionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "read" => Ok(Action::Read),
            "create" => Ok(Action::Create),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            _ => Err(PermissionParseError::UnknownAction(s.to_string())),
        }
    }
}

/// A single `(resource, action)` grant, rendered as `"client.update"`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Permission {
    pub resource: Resource,
    pub action: Action,
}

impl Permission {
    pub const fn new(resource: Resource, action: Action) -> Self {
        Self { resource, action }
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}", self.resource, self.action)
    }
}

impl FromStr for Permission {
    type Err = PermissionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (resource, action) = s
            .split_once('.')
            .ok_or_else(|| PermissionParseError::Malformed(s.to_string()))?;
        Ok(Self {
            resource: resource.parse()?,
            action: action.parse()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_display() {
        for resource in Resource::ALL {
            assert_eq!(resource.to_string().parse::<Resource>().unwrap(), resource);
        }
        for action in Action::ALL {
            assert_eq!(action.to_string().parse::<Action>().unwrap(), action);
        }
    }

    #[test]
    fn table_names_parse_as_resources() {
        assert_eq!("roles".parse::<Resource>().unwrap(), Resource::Role);
        assert_eq!("Clients".parse::<Resource>().unwrap(), Resource::Client);
    }

    #[test]
    fn unknown_names_are_errors() {
        assert!(matches!(
            "invoice".parse::<Resource>(),
            Err(PermissionParseError::UnknownResource(_))
        ));
        assert!(matches!(
            "archive".parse::<Action>(),
            Err(PermissionParseError::UnknownAction(_))
        ));
        assert!(matches!(
            "client-read".parse::<Permission>(),
            Err(PermissionParseError::Malformed(_))
        ));
    }

    #[test]
    fn permission_display_uses_dotted_form() {
        let p: Permission = "contract.update".parse().unwrap();
        assert_eq!(p, Permission::new(Resource::Contract, Action::Update));
        assert_eq!(p.to_string(), "contract.update");
    }
}
