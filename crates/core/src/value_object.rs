//! Value objects: equality by value, not identity.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values; two
/// `Email`s holding the same address are the same email.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// A normalized e-mail address (trimmed, lower-cased, contains `@`).
///
/// Login looks credentials up by exact match, so every address that reaches
/// the store goes through this type first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let normalized = raw.trim().to_lowercase();
        let Some((local, domain)) = normalized.split_once('@') else {
            return Err(DomainError::validation(format!("invalid email '{raw}'")));
        };
        if local.is_empty() || domain.is_empty() || normalized.contains(char::is_whitespace) {
            return Err(DomainError::validation(format!("invalid email '{raw}'")));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for Email {}

impl core::fmt::Display for Email {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Email {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

/// Reject empty or whitespace-only text fields.
pub(crate) fn non_empty(field: &str, value: &str) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_normalized() {
        let email = Email::parse("  Alice.Dupont@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "alice.dupont@example.com");
    }

    #[test]
    fn email_requires_local_and_domain_parts() {
        assert!(Email::parse("invalid-email").is_err());
        assert!(Email::parse("@example.com").is_err());
        assert!(Email::parse("alice@").is_err());
        assert!(Email::parse("al ice@example.com").is_err());
    }

    #[test]
    fn email_deserialization_validates() {
        let ok: Email = serde_json::from_str("\"bob@example.com\"").unwrap();
        assert_eq!(ok.as_str(), "bob@example.com");
        assert!(serde_json::from_str::<Email>("\"bob\"").is_err());
    }
}
