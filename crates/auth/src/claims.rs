use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use epiccrm_core::CollaboratorId;

use crate::{AuthError, Principal, Role};

/// Session token payload.
///
/// Wire shape: `{"sub": "<collaborator id>", "email": "...", "role": "...",
/// "exp": <unix seconds>}`. Issuing and immediately validating a token yields
/// an equal value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the collaborator id, as a string.
    pub sub: String,
    pub email: String,
    pub role: String,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

impl SessionClaims {
    pub fn new(principal: &Principal, expires_at: DateTime<Utc>) -> Self {
        Self {
            sub: principal.id.to_string(),
            email: principal.email.clone(),
            role: principal.role.to_string(),
            exp: expires_at.timestamp(),
        }
    }

    /// Claims for `principal` expiring `ttl` after `now`.
    pub fn expiring_in(principal: &Principal, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self::new(principal, now + ttl)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Rebuild the acting principal. A subject that is not a collaborator id
    /// means the token was not minted by us.
    pub fn principal(&self) -> Result<Principal, AuthError> {
        let id: CollaboratorId = self.sub.parse().map_err(|_| AuthError::InvalidToken)?;
        Ok(Principal::new(id, self.email.clone(), Role::from(self.role.as_str())))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,
}

/// Deterministically validate the time window of already-decoded claims.
///
/// Signature verification happens before this, in the token service.
pub fn validate_claims(claims: &SessionClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if now.timestamp() >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal() -> Principal {
        Principal::new(CollaboratorId::new(7), "bob@example.com", Role::SUPPORT)
    }

    #[test]
    fn claims_expire_exactly_at_exp() {
        let now = Utc::now();
        let claims = SessionClaims::expiring_in(&principal(), now, Duration::minutes(60));

        assert!(validate_claims(&claims, now).is_ok());
        assert!(validate_claims(&claims, now + Duration::minutes(59)).is_ok());
        assert_eq!(
            validate_claims(&claims, now + Duration::minutes(60)),
            Err(TokenValidationError::Expired)
        );
    }

    #[test]
    fn principal_round_trips_through_claims() {
        let claims = SessionClaims::new(&principal(), Utc::now());
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.principal().unwrap(), principal());
    }

    #[test]
    fn non_numeric_subject_is_an_invalid_token() {
        let mut claims = SessionClaims::new(&principal(), Utc::now());
        claims.sub = "not-an-id".to_string();
        assert_eq!(claims.principal(), Err(AuthError::InvalidToken));
    }

    #[test]
    fn wire_shape_has_four_fields() {
        let claims = SessionClaims {
            sub: "1".to_string(),
            email: "a@b.c".to_string(),
            role: "gestion".to_string(),
            exp: 1_700_000_000,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"sub": "1", "email": "a@b.c", "role": "gestion", "exp": 1_700_000_000})
        );
    }
}
