//! Schema creation, role seeding and policy loading.

use epiccrm_auth::{PermissionPolicy, PolicySource};

use crate::{CrmStore, StoreError, StoreResult};

/// Postgres schema. Every statement is idempotent.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS roles (
    id          BIGSERIAL PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    permissions JSONB NOT NULL DEFAULT '{}'::jsonb
);

CREATE TABLE IF NOT EXISTS collaborators (
    id            BIGSERIAL PRIMARY KEY,
    name          TEXT NOT NULL,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role_id       BIGINT NOT NULL REFERENCES roles (id)
);

CREATE TABLE IF NOT EXISTS clients (
    id                    BIGSERIAL PRIMARY KEY,
    full_name             TEXT NOT NULL,
    email                 TEXT NOT NULL UNIQUE,
    phone                 TEXT NOT NULL,
    company               TEXT NOT NULL,
    created_on            DATE NOT NULL,
    updated_on            DATE,
    contact_commercial_id BIGINT REFERENCES collaborators (id) ON DELETE SET NULL
);

CREATE TABLE IF NOT EXISTS contracts (
    id                    BIGSERIAL PRIMARY KEY,
    client_id             BIGINT NOT NULL REFERENCES clients (id),
    contact_commercial_id BIGINT NOT NULL REFERENCES collaborators (id),
    total_amount          DOUBLE PRECISION NOT NULL CHECK (total_amount >= 0),
    remaining_amount      DOUBLE PRECISION NOT NULL
                          CHECK (remaining_amount >= 0 AND remaining_amount <= total_amount),
    created_on            DATE NOT NULL,
    signed                BOOLEAN NOT NULL DEFAULT FALSE
);

CREATE TABLE IF NOT EXISTS events (
    id                 BIGSERIAL PRIMARY KEY,
    contract_id        BIGINT NOT NULL REFERENCES contracts (id),
    client_id          BIGINT NOT NULL REFERENCES clients (id),
    support_contact_id BIGINT REFERENCES collaborators (id) ON DELETE SET NULL,
    starts_at          TIMESTAMP NOT NULL,
    ends_at            TIMESTAMP NOT NULL CHECK (ends_at >= starts_at),
    location           TEXT NOT NULL,
    attendees          INTEGER NOT NULL CHECK (attendees >= 0),
    expected_attendees INTEGER CHECK (expected_attendees >= 0),
    notes              TEXT
);
"#;

/// Create the schema and seed the policy's roles. Safe to run repeatedly.
///
/// Returns the names of the roles that were created by this call.
pub fn initialize<S>(store: &S, policy: &PermissionPolicy) -> StoreResult<Vec<String>>
where
    S: CrmStore + ?Sized,
{
    store.ensure_schema()?;
    seed_roles(store, policy)
}

/// Insert a role record for every role the policy knows, unless one with that
/// name already exists. Existing records are left untouched.
pub fn seed_roles<S>(store: &S, policy: &PermissionPolicy) -> StoreResult<Vec<String>>
where
    S: CrmStore + ?Sized,
{
    let mut created = Vec::new();
    for role in policy.roles() {
        if store.role_by_name(role.as_str())?.is_some() {
            tracing::debug!(role = %role, "role already present");
            continue;
        }
        store.create_role(role.as_str(), &policy.to_permission_map(role))?;
        tracing::info!(role = %role, "role seeded");
        created.push(role.to_string());
    }
    Ok(created)
}

/// Resolve the permission policy for this process.
///
/// `Builtin` never touches the store. `Store` compiles the persisted role
/// records; an unknown resource or action in any record is an error rather
/// than a silently narrower policy.
pub fn load_policy<S>(store: &S, source: PolicySource) -> StoreResult<PermissionPolicy>
where
    S: CrmStore + ?Sized,
{
    match source {
        PolicySource::Builtin => Ok(PermissionPolicy::builtin()),
        PolicySource::Store => {
            let records = store.list_roles()?;
            PermissionPolicy::from_role_records(&records)
                .map_err(|e| StoreError::Validation(format!("stored role permissions are invalid: {e}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryStore;
    use epiccrm_auth::{Action, Resource, Role};
    use epiccrm_core::PermissionMap;

    #[test]
    fn initialize_seeds_catalog_roles_once() {
        let store = InMemoryStore::new();
        let policy = PermissionPolicy::builtin();

        let first = initialize(&store, &policy).unwrap();
        assert_eq!(first, vec!["commercial", "gestion", "support"]);

        let second = initialize(&store, &policy).unwrap();
        assert!(second.is_empty());
        assert_eq!(store.list_roles().unwrap().len(), 3);
    }

    #[test]
    fn seeded_permissions_match_policy() {
        let store = InMemoryStore::new();
        let policy = PermissionPolicy::builtin();
        seed_roles(&store, &policy).unwrap();

        let support = store.role_by_name("support").unwrap().unwrap();
        assert_eq!(support.permissions, policy.to_permission_map(&Role::SUPPORT));
    }

    #[test]
    fn existing_role_records_are_not_overwritten() {
        let store = InMemoryStore::new();
        let mut custom = PermissionMap::new();
        custom.insert("client".to_string(), vec!["read".to_string()]);
        store.create_role("gestion", &custom).unwrap();

        let created = seed_roles(&store, &PermissionPolicy::builtin()).unwrap();
        assert!(!created.contains(&"gestion".to_string()));
        assert_eq!(store.role_by_name("gestion").unwrap().unwrap().permissions, custom);
    }

    #[test]
    fn store_policy_reflects_persisted_records() {
        let store = InMemoryStore::new();
        let mut perms = PermissionMap::new();
        perms.insert("event".to_string(), vec!["read".to_string(), "update".to_string()]);
        store.create_role("support", &perms).unwrap();

        let policy = load_policy(&store, PolicySource::Store).unwrap();
        assert!(policy.is_allowed(&Role::SUPPORT, Resource::Event, Action::Update));
        assert!(!policy.is_allowed(&Role::SUPPORT, Resource::Client, Action::Read));
        assert!(!policy.is_allowed(&Role::GESTION, Resource::Client, Action::Read));
    }

    #[test]
    fn builtin_policy_ignores_store() {
        let store = InMemoryStore::new();
        store.create_role("support", &PermissionMap::new()).unwrap();

        let policy = load_policy(&store, PolicySource::Builtin).unwrap();
        assert!(policy.is_allowed(&Role::SUPPORT, Resource::Client, Action::Read));
    }

    #[test]
    fn malformed_stored_permissions_are_rejected() {
        let store = InMemoryStore::new();
        let mut perms = PermissionMap::new();
        perms.insert("client".to_string(), vec!["lire".to_string()]);
        store.create_role("gestion", &perms).unwrap();

        assert!(matches!(load_policy(&store, PolicySource::Store), Err(StoreError::Validation(_))));
    }
}
