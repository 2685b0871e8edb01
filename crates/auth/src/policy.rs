//! Role → permission policy.
//!
//! The policy is a plain value built once at process start and handed to
//! whoever needs to check permissions. Lookups are pure.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use core::str::FromStr;

use epiccrm_core::{PermissionMap, RoleRecord};

use crate::{Action, Permission, PermissionParseError, Resource, Role};

type Grants = BTreeMap<Resource, BTreeSet<Action>>;

/// Static table of `role → resource → allowed actions`.
///
/// No wildcard and no inheritance: each role's grants are enumerated
/// independently, and anything not enumerated is denied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionPolicy {
    grants: HashMap<Role, Grants>,
}

impl PermissionPolicy {
    /// A policy that grants nothing to anyone.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The compiled-in default table for the `gestion` / `commercial` /
    /// `support` catalog.
    pub fn builtin() -> Self {
        use Action::*;

        Self::empty()
            .grant(Role::GESTION, Resource::Collaborator, &[Read, Create, Update, Delete])
            .grant(Role::GESTION, Resource::Client, &[Read])
            .grant(Role::GESTION, Resource::Contract, &[Read, Create, Update, Delete])
            .grant(Role::GESTION, Resource::Event, &[Read, Update])
            .grant(Role::GESTION, Resource::Role, &[Read, Create, Update, Delete])
            .grant(Role::COMMERCIAL, Resource::Client, &[Read, Create, Update])
            .grant(Role::COMMERCIAL, Resource::Contract, &[Read, Create, Update])
            .grant(Role::COMMERCIAL, Resource::Event, &[Read, Create])
            .grant(Role::SUPPORT, Resource::Client, &[Read])
            .grant(Role::SUPPORT, Resource::Contract, &[Read])
            .grant(Role::SUPPORT, Resource::Event, &[Read, Update])
    }

    /// Add grants for `role` on `resource` (builder style).
    pub fn grant(mut self, role: Role, resource: Resource, actions: &[Action]) -> Self {
        self.grants
            .entry(role)
            .or_default()
            .entry(resource)
            .or_default()
            .extend(actions.iter().copied());
        self
    }

    /// `true` iff `action` is enumerated for `role` on `resource`.
    pub fn is_allowed(&self, role: &Role, resource: Resource, action: Action) -> bool {
        self.grants
            .get(role)
            .and_then(|by_resource| by_resource.get(&resource))
            .is_some_and(|actions| actions.contains(&action))
    }

    pub fn knows_role(&self, role: &Role) -> bool {
        self.grants.contains_key(role)
    }

    /// Roles present in the table, sorted by name.
    pub fn roles(&self) -> Vec<&Role> {
        let mut roles: Vec<&Role> = self.grants.keys().collect();
        roles.sort();
        roles
    }

    /// Every permission granted to `role`, in resource/action order.
    pub fn permissions_for(&self, role: &Role) -> Vec<Permission> {
        self.grants
            .get(role)
            .map(|by_resource| {
                by_resource
                    .iter()
                    .flat_map(|(resource, actions)| {
                        actions.iter().map(|action| Permission::new(*resource, *action))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Roles that would grant `(resource, action)`.
    pub fn roles_granting(&self, resource: Resource, action: Action) -> Vec<&Role> {
        let mut roles: Vec<&Role> = self
            .grants
            .keys()
            .filter(|role| self.is_allowed(role, resource, action))
            .collect();
        roles.sort();
        roles
    }

    /// Render one role's grants as the JSON payload stored on role records.
    pub fn to_permission_map(&self, role: &Role) -> PermissionMap {
        self.grants
            .get(role)
            .map(|by_resource| {
                by_resource
                    .iter()
                    .map(|(resource, actions)| {
                        (
                            resource.as_str().to_string(),
                            actions.iter().map(|a| a.as_str().to_string()).collect(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Compile a policy from persisted role records.
    ///
    /// Unknown resource or action names in a stored payload are rejected
    /// rather than ignored.
    pub fn from_role_records(records: &[RoleRecord]) -> Result<Self, PermissionParseError> {
        let mut policy = Self::empty();
        for record in records {
            let role = Role::from(record.name.as_str());
            // Register the role even when its payload is empty.
            policy.grants.entry(role.clone()).or_default();
            for (resource, actions) in &record.permissions {
                let resource: Resource = resource.parse()?;
                let actions = actions
                    .iter()
                    .map(|a| a.parse::<Action>())
                    .collect::<Result<Vec<_>, _>>()?;
                policy = policy.grant(role.clone(), resource, &actions);
            }
        }
        Ok(policy)
    }
}

/// Where the process takes its policy from.
///
/// The compiled-in table is authoritative by default. Role records are
/// seeded from that same table, so the two agree until someone edits a role
/// row; `Store` opts in to honouring those edits.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum PolicySource {
    #[default]
    Builtin,
    Store,
}

impl FromStr for PolicySource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "builtin" => Ok(PolicySource::Builtin),
            "store" => Ok(PolicySource::Store),
            other => Err(format!("unknown policy source '{other}' (expected 'builtin' or 'store')")),
        }
    }
}

impl core::fmt::Display for PolicySource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PolicySource::Builtin => f.write_str("builtin"),
            PolicySource::Store => f.write_str("store"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use epiccrm_core::RoleId;
    use proptest::prelude::*;

    fn table() -> Vec<(Role, Resource, Vec<Action>)> {
        use Action::*;
        vec![
            (Role::GESTION, Resource::Collaborator, vec![Read, Create, Update, Delete]),
            (Role::GESTION, Resource::Client, vec![Read]),
            (Role::GESTION, Resource::Contract, vec![Read, Create, Update, Delete]),
            (Role::GESTION, Resource::Event, vec![Read, Update]),
            (Role::GESTION, Resource::Role, vec![Read, Create, Update, Delete]),
            (Role::COMMERCIAL, Resource::Client, vec![Read, Create, Update]),
            (Role::COMMERCIAL, Resource::Contract, vec![Read, Create, Update]),
            (Role::COMMERCIAL, Resource::Event, vec![Read, Create]),
            (Role::SUPPORT, Resource::Client, vec![Read]),
            (Role::SUPPORT, Resource::Contract, vec![Read]),
            (Role::SUPPORT, Resource::Event, vec![Read, Update]),
        ]
    }

    fn enumerated(role: &Role, resource: Resource, action: Action) -> bool {
        table()
            .iter()
            .any(|(r, res, actions)| r == role && *res == resource && actions.contains(&action))
    }

    #[test]
    fn builtin_matches_default_table() {
        let policy = PermissionPolicy::builtin();
        for role in [Role::GESTION, Role::COMMERCIAL, Role::SUPPORT] {
            for resource in Resource::ALL {
                for action in Action::ALL {
                    assert_eq!(
                        policy.is_allowed(&role, resource, action),
                        enumerated(&role, resource, action),
                        "{role} {resource}.{action}"
                    );
                }
            }
        }
    }

    #[test]
    fn unknown_role_is_denied_not_an_error() {
        let policy = PermissionPolicy::builtin();
        assert!(!policy.is_allowed(&Role::from("admin"), Resource::Client, Action::Read));
        assert!(!policy.knows_role(&Role::from("admin")));
    }

    #[test]
    fn commercial_has_no_collaborator_or_role_access() {
        let policy = PermissionPolicy::builtin();
        for action in Action::ALL {
            assert!(!policy.is_allowed(&Role::COMMERCIAL, Resource::Collaborator, action));
            assert!(!policy.is_allowed(&Role::COMMERCIAL, Resource::Role, action));
        }
    }

    #[test]
    fn roles_granting_lists_every_matching_role() {
        let policy = PermissionPolicy::builtin();
        let roles = policy.roles_granting(Resource::Event, Action::Update);
        assert_eq!(roles, vec![&Role::GESTION, &Role::SUPPORT]);
    }

    #[test]
    fn permission_map_round_trips_through_role_records() {
        let builtin = PermissionPolicy::builtin();
        let records: Vec<RoleRecord> = builtin
            .roles()
            .into_iter()
            .enumerate()
            .map(|(i, role)| RoleRecord {
                id: RoleId::new(i as i64 + 1),
                name: role.to_string(),
                permissions: builtin.to_permission_map(role),
            })
            .collect();

        let compiled = PermissionPolicy::from_role_records(&records).unwrap();
        assert_eq!(compiled, builtin);
    }

    #[test]
    fn permission_map_uses_plain_names() {
        let map = PermissionPolicy::builtin().to_permission_map(&Role::SUPPORT);
        assert_eq!(map.get("event").unwrap(), &vec!["read".to_string(), "update".to_string()]);
        assert!(map.get("collaborator").is_none());
    }

    #[test]
    fn stored_payload_with_unknown_action_is_rejected() {
        let mut permissions = PermissionMap::new();
        permissions.insert("client".to_string(), vec!["lire".to_string()]);
        let records = vec![RoleRecord {
            id: RoleId::new(1),
            name: "gestion".to_string(),
            permissions,
        }];

        let err = PermissionPolicy::from_role_records(&records).unwrap_err();
        assert_eq!(err, PermissionParseError::UnknownAction("lire".to_string()));
    }

    #[test]
    fn policy_source_parses() {
        assert_eq!("store".parse::<PolicySource>().unwrap(), PolicySource::Store);
        assert_eq!("Builtin".parse::<PolicySource>().unwrap(), PolicySource::Builtin);
        assert!("database".parse::<PolicySource>().is_err());
    }

    fn any_role() -> impl Strategy<Value = Role> {
        prop_oneof![
            Just(Role::GESTION),
            Just(Role::COMMERCIAL),
            Just(Role::SUPPORT),
            "[a-z]{1,12}".prop_map(Role::from),
        ]
    }

    fn any_resource() -> impl Strategy<Value = Resource> {
        prop::sample::select(Resource::ALL.to_vec())
    }

    fn any_action() -> impl Strategy<Value = Action> {
        prop::sample::select(Action::ALL.to_vec())
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: anything not explicitly enumerated is denied.
        #[test]
        fn no_default_allow(role in any_role(), resource in any_resource(), action in any_action()) {
            let policy = PermissionPolicy::builtin();
            prop_assert_eq!(
                policy.is_allowed(&role, resource, action),
                enumerated(&role, resource, action)
            );
        }

        /// Property: lookups are pure; asking twice gives the same answer and
        /// leaves the policy unchanged.
        #[test]
        fn lookups_do_not_mutate(role in any_role(), resource in any_resource(), action in any_action()) {
            let policy = PermissionPolicy::builtin();
            let before = policy.clone();
            let first = policy.is_allowed(&role, resource, action);
            let second = policy.is_allowed(&role, resource, action);
            prop_assert_eq!(first, second);
            prop_assert_eq!(policy, before);
        }
    }
}
