//! Local session persistence and the per-command session context.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::{AuthError, Principal, SessionClaims, TokenService};

/// Default location of the session token, relative to the working directory.
pub const DEFAULT_TOKEN_FILE: &str = ".token";

/// A single local file holding exactly one encoded token.
///
/// Presence is meaningful: no file means nobody is logged in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the stored token. A missing or blank file is `NoSession`.
    pub fn load(&self) -> Result<String, AuthError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                let token = content.trim();
                if token.is_empty() {
                    Err(AuthError::NoSession)
                } else {
                    Ok(token.to_string())
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(AuthError::NoSession),
            Err(e) => Err(AuthError::SessionFile(format!("{}: {e}", self.path.display()))),
        }
    }

    /// Replace any previous session with `token`.
    pub fn save(&self, token: &str) -> Result<(), AuthError> {
        write_private(&self.path, token)
            .map_err(|e| AuthError::SessionFile(format!("{}: {e}", self.path.display())))
    }

    /// Delete the session. Returns whether one existed.
    pub fn clear(&self) -> Result<bool, AuthError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AuthError::SessionFile(format!("{}: {e}", self.path.display()))),
        }
    }
}

impl Default for TokenFile {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_FILE)
    }
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents.as_bytes())
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    std::fs::write(path, contents)
}

/// The authenticated caller for one command invocation.
///
/// Resolved once up front and passed explicitly to command handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    principal: Principal,
    claims: SessionClaims,
}

impl SessionContext {
    /// Load the stored token and validate it.
    pub fn resolve(file: &TokenFile, tokens: &TokenService) -> Result<Self, AuthError> {
        let token = file.load()?;
        let claims = tokens.validate_token(&token)?;
        Self::from_claims(claims)
    }

    pub fn from_claims(claims: SessionClaims) -> Result<Self, AuthError> {
        let principal = claims.principal()?;
        Ok(Self { principal, claims })
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn claims(&self) -> &SessionClaims {
        &self.claims
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.claims.expires_at()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use chrono::Duration;
    use epiccrm_core::CollaboratorId;

    fn tokens() -> TokenService {
        TokenService::new(b"session-secret").unwrap()
    }

    fn claims(ttl_minutes: i64) -> SessionClaims {
        let principal = Principal::new(CollaboratorId::new(4), "dana@example.com", Role::GESTION);
        SessionClaims::expiring_in(&principal, Utc::now(), Duration::minutes(ttl_minutes))
    }

    #[test]
    fn missing_file_is_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let file = TokenFile::new(dir.path().join(".token"));

        assert!(!file.exists());
        assert_eq!(file.load(), Err(AuthError::NoSession));
        assert_eq!(SessionContext::resolve(&file, &tokens()), Err(AuthError::NoSession));
    }

    #[test]
    fn blank_file_is_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let file = TokenFile::new(dir.path().join(".token"));
        file.save("  \n").unwrap();
        assert_eq!(file.load(), Err(AuthError::NoSession));
    }

    #[test]
    fn save_overwrites_previous_session() {
        let dir = tempfile::tempdir().unwrap();
        let file = TokenFile::new(dir.path().join(".token"));
        file.save("first").unwrap();
        file.save("second\n").unwrap();
        assert_eq!(file.load().unwrap(), "second");
    }

    #[test]
    fn clear_reports_whether_a_session_existed() {
        let dir = tempfile::tempdir().unwrap();
        let file = TokenFile::new(dir.path().join(".token"));
        assert!(!file.clear().unwrap());
        file.save("token").unwrap();
        assert!(file.clear().unwrap());
        assert!(!file.exists());
    }

    #[test]
    fn resolve_yields_principal_from_valid_token() {
        let dir = tempfile::tempdir().unwrap();
        let file = TokenFile::new(dir.path().join(".token"));
        let tokens = tokens();
        let claims = claims(30);
        file.save(&tokens.encode_claims(&claims).unwrap()).unwrap();

        let session = SessionContext::resolve(&file, &tokens).unwrap();
        assert_eq!(session.principal().id, CollaboratorId::new(4));
        assert_eq!(session.principal().role, Role::GESTION);
        assert_eq!(session.claims(), &claims);
    }

    #[test]
    fn resolve_distinguishes_expired_and_corrupt_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let file = TokenFile::new(dir.path().join(".token"));
        let tokens = tokens();

        file.save(&tokens.encode_claims(&claims(-1)).unwrap()).unwrap();
        assert_eq!(SessionContext::resolve(&file, &tokens), Err(AuthError::ExpiredSession));

        file.save("corrupted-token").unwrap();
        assert_eq!(SessionContext::resolve(&file, &tokens), Err(AuthError::InvalidToken));
    }

    #[cfg(unix)]
    #[test]
    fn token_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let file = TokenFile::new(dir.path().join(".token"));
        file.save("token").unwrap();

        let mode = std::fs::metadata(file.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
