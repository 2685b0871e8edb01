//! Password hashing and verification (Argon2id, PHC strings).

use argon2::password_hash::{self, PasswordHash, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};
use rand::RngCore;
use thiserror::Error;

// Upper bound on accepted cleartext, so nothing ever tries to hash a
// humongous buffer.
pub const MAX_PASSWORD_LENGTH: usize = 512;

const SALT_LEN: usize = 16;

/// A cleartext password as typed by a user.
//
// Deliberately no way to get the string back out, and `Debug` is redacted.
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: &str) -> Result<Password, PasswordError> {
        if password.is_empty() {
            return Err(PasswordError::Empty);
        }
        if password.len() > MAX_PASSWORD_LENGTH {
            return Err(PasswordError::TooLong);
        }
        Ok(Password(password.to_string()))
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl core::fmt::Debug for Password {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("the password cannot be empty")]
    Empty,

    #[error("the password provided was too long")]
    TooLong,

    #[error("failed to hash password: {0}")]
    Hash(String),

    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),
}

/// Argon2id parameters used when hashing new passwords.
///
/// Verification always uses the parameters embedded in the stored PHC
/// string, so changing the scheme never locks out existing accounts.
#[derive(Debug, Clone)]
pub struct PasswordScheme {
    params: Params,
}

impl PasswordScheme {
    /// The `argon2` crate's recommended defaults (19 MiB, t=2, p=1).
    pub fn standard() -> Self {
        Self {
            params: Params::default(),
        }
    }

    /// Minimum-cost parameters. Only for tests and throwaway dev databases.
    pub fn low_cost() -> Self {
        let params = Params::new(Params::MIN_M_COST, Params::MIN_T_COST, Params::MIN_P_COST, None)
            .unwrap_or_default();
        Self { params }
    }

    fn argon(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash `password` with a fresh random salt, returning a PHC string.
    pub fn hash(&self, password: &Password) -> Result<String, PasswordError> {
        let mut salt_bytes = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| PasswordError::Hash(e.to_string()))?;

        let hash = self
            .argon()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::Hash(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// `Ok(false)` on mismatch; `Err` only when the stored hash is unusable.
    pub fn verify(&self, password: &Password, stored_hash: &str) -> Result<bool, PasswordError> {
        let parsed =
            PasswordHash::new(stored_hash).map_err(|e| PasswordError::MalformedHash(e.to_string()))?;
        match self.argon().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::MalformedHash(e.to_string())),
        }
    }
}

impl Default for PasswordScheme {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let scheme = PasswordScheme::low_cost();
        let password = Password::new("MotDePasse123").unwrap();
        let hash = scheme.hash(&password).unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(scheme.verify(&password, &hash).unwrap());
        assert!(!scheme.verify(&Password::new("wrong").unwrap(), &hash).unwrap());
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let scheme = PasswordScheme::low_cost();
        let password = Password::new("hunter2").unwrap();
        assert_ne!(scheme.hash(&password).unwrap(), scheme.hash(&password).unwrap());
    }

    #[test]
    fn verification_uses_stored_parameters() {
        let password = Password::new("hunter2").unwrap();
        let hash = PasswordScheme::low_cost().hash(&password).unwrap();
        assert!(PasswordScheme::standard().verify(&password, &hash).unwrap());
    }

    #[test]
    fn password_length_limits() {
        assert_eq!(Password::new("").unwrap_err(), PasswordError::Empty);
        let long = "x".repeat(MAX_PASSWORD_LENGTH + 1);
        assert_eq!(Password::new(&long).unwrap_err(), PasswordError::TooLong);
    }

    #[test]
    fn malformed_hash_is_an_error_not_a_mismatch() {
        let scheme = PasswordScheme::low_cost();
        let password = Password::new("hunter2").unwrap();
        assert!(matches!(
            scheme.verify(&password, "pbkdf2:sha256:legacy"),
            Err(PasswordError::MalformedHash(_))
        ));
    }

    #[test]
    fn debug_output_is_redacted() {
        let password = Password::new("hunter2").unwrap();
        assert!(!format!("{password:?}").contains("hunter2"));
    }
}
