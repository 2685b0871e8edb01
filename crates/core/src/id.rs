//! Strongly-typed identifiers used across the domain.
//!
//! Identifiers are database-assigned integers; the newtypes keep a client id
//! from ever being compared against a collaborator id.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a collaborator (staff member, acting principal).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollaboratorId(i64);

/// Identifier of a client.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(i64);

/// Identifier of a contract.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractId(i64);

/// Identifier of an event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(i64);

/// Identifier of a role record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(i64);

macro_rules! impl_int_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = s
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                if value <= 0 {
                    return Err(DomainError::invalid_id(format!(
                        "{}: must be positive, got {}",
                        $name, value
                    )));
                }
                Ok(Self(value))
            }
        }
    };
}

impl_int_newtype!(CollaboratorId, "CollaboratorId");
impl_int_newtype!(ClientId, "ClientId");
impl_int_newtype!(ContractId, "ContractId");
impl_int_newtype!(EventId, "EventId");
impl_int_newtype!(RoleId, "RoleId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positive_ids() {
        let id: CollaboratorId = "42".parse().unwrap();
        assert_eq!(id.get(), 42);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn rejects_garbage_and_non_positive_ids() {
        assert!("abc".parse::<ClientId>().is_err());
        assert!("0".parse::<ClientId>().is_err());

        let err = "-3".parse::<ContractId>().unwrap_err();
        assert!(err.to_string().contains("ContractId"));
    }

    #[test]
    fn serializes_as_bare_integer() {
        let json = serde_json::to_string(&EventId::new(7)).unwrap();
        assert_eq!(json, "7");
    }
}
