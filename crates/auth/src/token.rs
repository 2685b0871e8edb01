//! Session token issuance and validation (HS256 JWT).

use std::collections::HashSet;
use std::sync::OnceLock;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use epiccrm_core::CollaboratorId;

use crate::{AuthError, Password, PasswordScheme, Principal, Role, SessionClaims, validate_claims};

pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 60;

/// Cleartext behind the hash that unknown emails are checked against.
const DUMMY_PASSWORD: &str = "epiccrm-no-such-account";

/// What login needs to know about a collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub id: CollaboratorId,
    pub email: String,
    pub password_hash: String,
    pub role: String,
}

/// Credential lookup seam (implemented by the store).
pub trait CredentialStore {
    type Error: std::error::Error;

    /// Exact-match lookup by email.
    fn find_credential(&self, email: &str) -> Result<Option<Credential>, Self::Error>;
}

/// Issues and validates signed, time-limited session tokens.
///
/// The service does not know where tokens are kept; see
/// [`crate::session::TokenFile`] for the CLI's convention.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
    passwords: PasswordScheme,
    // Hashed with `passwords` on first use; `None` if hashing failed.
    dummy_hash: OnceLock<Option<String>>,
}

impl TokenService {
    pub fn new(secret: &[u8]) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::Configuration("token secret cannot be empty".to_string()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked by `validate_claims` against an explicit clock;
        // jsonwebtoken only verifies signature and structure here.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::from(["exp".to_string(), "sub".to_string()]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl: Duration::minutes(DEFAULT_TOKEN_TTL_MINUTES),
            passwords: PasswordScheme::standard(),
            dummy_hash: OnceLock::new(),
        })
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_password_scheme(mut self, scheme: PasswordScheme) -> Self {
        self.passwords = scheme;
        self.dummy_hash = OnceLock::new();
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Verify `email`/`password` against the store and mint a token valid for
    /// the configured TTL.
    pub fn issue_token<S>(&self, store: &S, email: &str, password: &str) -> Result<String, AuthError>
    where
        S: CredentialStore + ?Sized,
    {
        self.issue_token_with_ttl(store, email, password, self.ttl)
    }

    pub fn issue_token_with_ttl<S>(
        &self,
        store: &S,
        email: &str,
        password: &str,
        ttl: Duration,
    ) -> Result<String, AuthError>
    where
        S: CredentialStore + ?Sized,
    {
        let email = email.trim().to_lowercase();
        let credential = store
            .find_credential(&email)
            .map_err(|e| AuthError::Credentials(e.to_string()))?;

        let Some(credential) = credential else {
            self.verify_against_dummy(password);
            tracing::info!(email = %email, "login rejected");
            return Err(AuthError::Authentication);
        };

        // An over-long password can't match anything we stored.
        let Ok(password) = Password::new(password) else {
            tracing::info!(email = %email, "login rejected");
            return Err(AuthError::Authentication);
        };

        if !self.passwords.verify(&password, &credential.password_hash)? {
            tracing::info!(email = %email, "login rejected");
            return Err(AuthError::Authentication);
        }

        let principal = Principal::new(credential.id, credential.email, Role::from(credential.role));
        let claims = SessionClaims::expiring_in(&principal, Utc::now(), ttl);
        let token = self.encode_claims(&claims)?;

        tracing::info!(principal = %principal, exp = claims.exp, "session token issued");
        Ok(token)
    }

    /// Spend the same argon2 work a real mismatch would, so an unknown
    /// email takes as long to reject as a wrong password.
    fn verify_against_dummy(&self, password: &str) {
        let hash = self.dummy_hash.get_or_init(|| {
            Password::new(DUMMY_PASSWORD)
                .ok()
                .and_then(|dummy| self.passwords.hash(&dummy).ok())
        });
        let (Some(hash), Ok(password)) = (hash, Password::new(password)) else {
            return;
        };
        let _ = self.passwords.verify(&password, hash);
    }

    /// Sign already-built claims.
    pub fn encode_claims(&self, claims: &SessionClaims) -> Result<String, AuthError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::Configuration(format!("failed to sign token: {e}")))
    }

    /// Verify signature and expiry, returning the embedded claims unchanged.
    pub fn validate_token(&self, token: &str) -> Result<SessionClaims, AuthError> {
        self.validate_token_at(token, Utc::now())
    }

    pub fn validate_token_at(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, AuthError> {
        let data = jsonwebtoken::decode::<SessionClaims>(token.trim(), &self.decoding, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "session token rejected");
                AuthError::InvalidToken
            })?;

        validate_claims(&data.claims, now).map_err(|_| {
            tracing::debug!(exp = data.claims.exp, "session token expired");
            AuthError::ExpiredSession
        })?;

        Ok(data.claims)
    }
}
