use serde::Serialize;

use epiccrm_core::CollaboratorId;

use crate::{Action, AuthzError, Permission, PermissionPolicy, Principal, Resource};

/// Coarse role check: may `principal` perform `action` on `resource` at all?
///
/// - No IO
/// - No panics
/// - Row-level ownership is checked separately by the ownership guard
pub fn authorize(
    policy: &PermissionPolicy,
    principal: &Principal,
    resource: Resource,
    action: Action,
) -> Result<(), AuthzError> {
    if policy.is_allowed(&principal.role, resource, action) {
        Ok(())
    } else {
        tracing::info!(
            principal = %principal,
            permission = %Permission::new(resource, action),
            "permission denied by role policy"
        );
        Err(AuthzError::Forbidden {
            role: principal.role.to_string(),
            resource,
            action,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision.
///
/// Answers "why was I allowed/denied?" for `role explain`.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    /// The permission that was being checked.
    pub required_permission: Permission,

    /// Whether the authorization was granted.
    pub granted: bool,

    /// Human-readable reason for the decision.
    pub reason: String,

    /// Details about the principal's state.
    pub principal: PrincipalState,

    /// If denied, this explains what was missing.
    pub denial_reason: Option<DenialReason>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrincipalState {
    pub id: CollaboratorId,
    pub email: String,
    pub role: String,
    pub known_role: bool,
    pub effective_permissions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DenialReason {
    pub message: String,
    pub suggestions: Vec<String>,
}

/// Explain why an authorization decision was made (or would be made).
///
/// Row-level ownership is out of scope here: a granted explanation means the
/// role may perform the action on *some* records.
pub fn explain_authorization(
    policy: &PermissionPolicy,
    principal: &Principal,
    resource: Resource,
    action: Action,
) -> AuthorizationExplanation {
    let required = Permission::new(resource, action);
    let granted = policy.is_allowed(&principal.role, resource, action);

    let state = PrincipalState {
        id: principal.id,
        email: principal.email.clone(),
        role: principal.role.to_string(),
        known_role: policy.knows_role(&principal.role),
        effective_permissions: policy
            .permissions_for(&principal.role)
            .iter()
            .map(Permission::to_string)
            .collect(),
    };

    if granted {
        return AuthorizationExplanation {
            required_permission: required,
            granted: true,
            reason: format!("role '{}' grants '{}'", principal.role, required),
            principal: state,
            denial_reason: None,
        };
    }

    let granting: Vec<String> = policy
        .roles_granting(resource, action)
        .into_iter()
        .map(|r| r.to_string())
        .collect();

    let mut suggestions = Vec::new();
    if !state.known_role {
        suggestions.push(format!(
            "Role '{}' is not part of the policy; ask management to assign a catalog role",
            principal.role
        ));
    }
    if granting.is_empty() {
        suggestions.push(format!("No role currently grants '{required}'"));
    } else {
        suggestions.push(format!("Roles granting '{required}': {}", granting.join(", ")));
    }

    AuthorizationExplanation {
        required_permission: required,
        granted: false,
        reason: format!(
            "role '{}' does not grant '{}'. Current permissions: {:?}",
            principal.role, required, state.effective_permissions
        ),
        principal: state,
        denial_reason: Some(DenialReason {
            message: format!("Missing required permission: '{required}'"),
            suggestions,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;

    fn principal(id: i64, role: Role) -> Principal {
        Principal::new(CollaboratorId::new(id), format!("user{id}@example.com"), role)
    }

    #[test]
    fn authorize_allows_enumerated_permission() {
        let policy = PermissionPolicy::builtin();
        assert!(authorize(&policy, &principal(1, Role::COMMERCIAL), Resource::Client, Action::Create).is_ok());
    }

    #[test]
    fn denial_carries_role_resource_action() {
        let policy = PermissionPolicy::builtin();
        let err = authorize(&policy, &principal(1, Role::SUPPORT), Resource::Contract, Action::Update)
            .unwrap_err();

        assert_eq!(
            err,
            AuthzError::Forbidden {
                role: "support".to_string(),
                resource: Resource::Contract,
                action: Action::Update,
            }
        );
        assert_eq!(err.to_string(), "permission denied: role 'support' may not update contract");
    }

    #[test]
    fn injected_policy_replaces_builtin() {
        let policy = PermissionPolicy::empty().grant(Role::SUPPORT, Resource::Contract, &[Action::Update]);
        assert!(authorize(&policy, &principal(1, Role::SUPPORT), Resource::Contract, Action::Update).is_ok());
        assert!(authorize(&policy, &principal(1, Role::GESTION), Resource::Contract, Action::Read).is_err());
    }

    #[test]
    fn explanation_lists_granting_roles_on_denial() {
        let policy = PermissionPolicy::builtin();
        let explanation =
            explain_authorization(&policy, &principal(2, Role::COMMERCIAL), Resource::Event, Action::Update);

        assert!(!explanation.granted);
        let denial = explanation.denial_reason.unwrap();
        assert!(denial.suggestions.iter().any(|s| s.contains("gestion, support")));
        assert!(explanation.principal.effective_permissions.contains(&"event.create".to_string()));
    }

    #[test]
    fn explanation_flags_unknown_roles() {
        let policy = PermissionPolicy::builtin();
        let explanation =
            explain_authorization(&policy, &principal(9, Role::from("admin")), Resource::Client, Action::Read);

        assert!(!explanation.granted);
        assert!(!explanation.principal.known_role);
        assert!(explanation.principal.effective_permissions.is_empty());
    }

    #[test]
    fn granted_explanation_has_no_denial() {
        let policy = PermissionPolicy::builtin();
        let explanation =
            explain_authorization(&policy, &principal(1, Role::GESTION), Resource::Role, Action::Delete);
        assert!(explanation.granted);
        assert!(explanation.denial_reason.is_none());
    }
}
