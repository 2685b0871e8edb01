use chrono::{NaiveDate, Utc};

use epiccrm_auth::{
    Action, AuthError, AuthzError, OwnershipGuard, PasswordScheme, PermissionPolicy, Resource, SessionContext,
    TokenFile, TokenService, authorize,
};
use epiccrm_infra::CrmStore;

/// Everything a command needs, built once per invocation.
///
/// The policy and guard are plain values injected here; handlers never reach
/// for globals.
pub struct App {
    store: Box<dyn CrmStore>,
    policy: PermissionPolicy,
    guard: OwnershipGuard,
    tokens: TokenService,
    token_file: TokenFile,
    passwords: PasswordScheme,
}

impl App {
    pub fn new(store: Box<dyn CrmStore>, tokens: TokenService, token_file: TokenFile) -> Self {
        Self {
            store,
            policy: PermissionPolicy::builtin(),
            guard: OwnershipGuard::default(),
            tokens,
            token_file,
            passwords: PasswordScheme::standard(),
        }
    }

    pub fn with_policy(mut self, policy: PermissionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_guard(mut self, guard: OwnershipGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Scheme used when hashing passwords for new or updated collaborators.
    pub fn with_password_scheme(mut self, passwords: PasswordScheme) -> Self {
        self.passwords = passwords;
        self
    }

    pub fn store(&self) -> &dyn CrmStore {
        self.store.as_ref()
    }

    pub fn policy(&self) -> &PermissionPolicy {
        &self.policy
    }

    pub fn guard(&self) -> &OwnershipGuard {
        &self.guard
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn token_file(&self) -> &TokenFile {
        &self.token_file
    }

    pub fn passwords(&self) -> &PasswordScheme {
        &self.passwords
    }

    /// Resolve the caller from the stored token.
    pub fn session(&self) -> Result<SessionContext, AuthError> {
        SessionContext::resolve(&self.token_file, &self.tokens)
    }

    /// Resolve the caller and check the coarse role permission in one go.
    pub fn authorized(&self, resource: Resource, action: Action) -> Result<SessionContext, AuthError> {
        let session = self.session()?;
        self.require(&session, resource, action)?;
        Ok(session)
    }

    pub fn require(&self, session: &SessionContext, resource: Resource, action: Action) -> Result<(), AuthzError> {
        authorize(&self.policy, session.principal(), resource, action)
    }

    pub fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}
