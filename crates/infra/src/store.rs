//! The CRM persistence seam.

use chrono::NaiveDate;

use epiccrm_auth::{Credential, CredentialStore};
use epiccrm_core::{
    Client, ClientId, ClientPatch, Collaborator, CollaboratorId, CollaboratorPatch, Contract, ContractId,
    ContractPatch, Event, EventId, EventPatch, NewClient, NewCollaborator, NewContract, NewEvent, PermissionMap,
    RoleRecord,
};

use crate::StoreResult;

/// Synchronous CRM store.
///
/// The CLI is one-shot and single-threaded, so every operation blocks until
/// the backend answers. Lookups return `Ok(None)` for a missing row; updates
/// and deletes return `StoreError::NotFound`.
pub trait CrmStore: Send + Sync {
    /// Create tables if they are missing. Idempotent.
    fn ensure_schema(&self) -> StoreResult<()>;

    // ── roles ───────────────────────────────────────────────────────────────

    fn role_by_name(&self, name: &str) -> StoreResult<Option<RoleRecord>>;
    fn list_roles(&self) -> StoreResult<Vec<RoleRecord>>;
    fn create_role(&self, name: &str, permissions: &PermissionMap) -> StoreResult<RoleRecord>;
    fn set_role_permissions(&self, name: &str, permissions: &PermissionMap) -> StoreResult<RoleRecord>;

    // ── collaborators ───────────────────────────────────────────────────────

    fn create_collaborator(&self, new: NewCollaborator) -> StoreResult<Collaborator>;
    fn collaborator(&self, id: CollaboratorId) -> StoreResult<Option<Collaborator>>;
    fn collaborator_by_email(&self, email: &str) -> StoreResult<Option<Collaborator>>;
    fn list_collaborators(&self) -> StoreResult<Vec<Collaborator>>;
    fn update_collaborator(&self, id: CollaboratorId, patch: &CollaboratorPatch) -> StoreResult<Collaborator>;
    fn delete_collaborator(&self, id: CollaboratorId) -> StoreResult<()>;

    // ── clients ─────────────────────────────────────────────────────────────

    fn create_client(&self, new: NewClient) -> StoreResult<Client>;
    fn client(&self, id: ClientId) -> StoreResult<Option<Client>>;
    fn list_clients(&self) -> StoreResult<Vec<Client>>;
    fn update_client(&self, id: ClientId, patch: &ClientPatch, today: NaiveDate) -> StoreResult<Client>;

    // ── contracts ───────────────────────────────────────────────────────────

    fn create_contract(&self, new: NewContract) -> StoreResult<Contract>;
    fn contract(&self, id: ContractId) -> StoreResult<Option<Contract>>;
    fn list_contracts(&self) -> StoreResult<Vec<Contract>>;
    fn update_contract(&self, id: ContractId, patch: &ContractPatch) -> StoreResult<Contract>;
    fn delete_contract(&self, id: ContractId) -> StoreResult<()>;

    // ── events ──────────────────────────────────────────────────────────────

    fn create_event(&self, new: NewEvent) -> StoreResult<Event>;
    fn event(&self, id: EventId) -> StoreResult<Option<Event>>;
    fn list_events(&self) -> StoreResult<Vec<Event>>;
    fn update_event(&self, id: EventId, patch: &EventPatch) -> StoreResult<Event>;
}

/// Login needs only id, email, hash and role name.
pub(crate) fn credential_for<S>(store: &S, email: &str) -> StoreResult<Option<Credential>>
where
    S: CrmStore + ?Sized,
{
    Ok(store.collaborator_by_email(email)?.map(|c| Credential {
        id: c.id,
        email: c.email.as_str().to_string(),
        password_hash: c.password_hash,
        role: c.role_name,
    }))
}

impl CredentialStore for dyn CrmStore + '_ {
    type Error = crate::StoreError;

    fn find_credential(&self, email: &str) -> StoreResult<Option<Credential>> {
        credential_for(self, email)
    }
}
