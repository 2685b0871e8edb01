//! Process exit statuses.

use epiccrm_auth::{AuthError, AuthzError};

pub const SUCCESS: u8 = 0;
pub const FAILURE: u8 = 1;
pub const NO_SESSION: u8 = 2;
pub const EXPIRED_SESSION: u8 = 3;
pub const INVALID_SESSION: u8 = 4;
pub const AUTHENTICATION_FAILED: u8 = 5;
pub const PERMISSION_DENIED: u8 = 6;

/// Pick the exit status for a failed command.
///
/// The first auth failure found anywhere in the error chain decides; anything
/// else (store, validation, configuration) is a generic failure.
pub fn code_for(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if let Some(auth) = cause.downcast_ref::<AuthError>() {
            return match auth {
                AuthError::NoSession => NO_SESSION,
                AuthError::ExpiredSession => EXPIRED_SESSION,
                AuthError::InvalidToken => INVALID_SESSION,
                AuthError::Authentication => AUTHENTICATION_FAILED,
                AuthError::PermissionDenied(_) => PERMISSION_DENIED,
                _ => FAILURE,
            };
        }
        if cause.downcast_ref::<AuthzError>().is_some() {
            return PERMISSION_DENIED;
        }
    }
    FAILURE
}
