//! `epiccrm-auth`: authentication and authorization core.
//!
//! Session tokens, the static role → permission policy, and the row-level
//! ownership predicates. This crate is decoupled from storage (it only sees a
//! [`CredentialStore`] seam) and from the CLI.

pub mod authorize;
pub mod claims;
pub mod error;
pub mod ownership;
pub mod password;
pub mod permissions;
pub mod policy;
pub mod principal;
pub mod roles;
pub mod session;
pub mod token;

pub use authorize::{AuthorizationExplanation, authorize, explain_authorization};
pub use claims::{SessionClaims, TokenValidationError, validate_claims};
pub use error::{AuthError, AuthzError};
pub use ownership::{Operation, OwnershipDecision, OwnershipDenial, OwnershipGuard};
pub use password::{Password, PasswordError, PasswordScheme};
pub use permissions::{Action, Permission, PermissionParseError, Resource};
pub use policy::{PermissionPolicy, PolicySource};
pub use principal::Principal;
pub use roles::{Role, RoleCatalog};
pub use session::{SessionContext, TokenFile};
pub use token::{Credential, CredentialStore, DEFAULT_TOKEN_TTL_MINUTES, TokenService};
