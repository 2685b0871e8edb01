use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::NaiveDate;

use epiccrm_auth::{Credential, CredentialStore};
use epiccrm_core::{
    Client, ClientId, ClientPatch, Collaborator, CollaboratorId, CollaboratorPatch, Contract, ContractId,
    ContractPatch, Entity, Event, EventId, EventPatch, NewClient, NewCollaborator, NewContract, NewEvent, PermissionMap,
    RoleId, RoleRecord,
};

use crate::store::credential_for;
use crate::{CrmStore, StoreError, StoreResult};

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    roles: BTreeMap<i64, RoleRecord>,
    collaborators: BTreeMap<i64, Collaborator>,
    clients: BTreeMap<i64, Client>,
    contracts: BTreeMap<i64, Contract>,
    events: BTreeMap<i64, Event>,
}

/// Write `row` under its own id and return a copy for the caller.
fn put<T>(table: &mut BTreeMap<i64, T>, row: T) -> T
where
    T: Entity + Clone,
    T::Id: Into<i64>,
{
    table.insert(row.id().into(), row.clone());
    row
}

impl Tables {
    /// Ids are shared across tables, which keeps them unique and positive.
    fn allocate(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn role_named(&self, name: &str) -> StoreResult<&RoleRecord> {
        self.roles
            .values()
            .find(|r| r.name == name)
            .ok_or_else(|| StoreError::Validation(format!("unknown role '{name}'")))
    }

    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.collaborators
            .values()
            .any(|c| c.email.as_str() == email && Some(c.id.get()) != except)
    }

    fn require_collaborator(&self, id: CollaboratorId) -> StoreResult<()> {
        if self.collaborators.contains_key(&id.get()) {
            Ok(())
        } else {
            Err(StoreError::not_found("collaborator", id))
        }
    }

    fn require_client(&self, id: ClientId) -> StoreResult<()> {
        if self.clients.contains_key(&id.get()) {
            Ok(())
        } else {
            Err(StoreError::not_found("client", id))
        }
    }
}

/// In-memory CRM store.
///
/// Intended for tests/dev. Mirrors the relational rules of the Postgres
/// schema: unique emails and role names, referential checks on create, and
/// restrict/set-null semantics on delete.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

impl CredentialStore for InMemoryStore {
    type Error = StoreError;

    fn find_credential(&self, email: &str) -> StoreResult<Option<Credential>> {
        credential_for(self, email)
    }
}

impl CrmStore for InMemoryStore {
    fn ensure_schema(&self) -> StoreResult<()> {
        Ok(())
    }

    fn role_by_name(&self, name: &str) -> StoreResult<Option<RoleRecord>> {
        let tables = self.read()?;
        Ok(tables.roles.values().find(|r| r.name == name).cloned())
    }

    fn list_roles(&self) -> StoreResult<Vec<RoleRecord>> {
        Ok(self.read()?.roles.values().cloned().collect())
    }

    fn create_role(&self, name: &str, permissions: &PermissionMap) -> StoreResult<RoleRecord> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::Validation("role name cannot be empty".to_string()));
        }

        let mut tables = self.write()?;
        if tables.roles.values().any(|r| r.name == name) {
            return Err(StoreError::Conflict(format!("role '{name}' already exists")));
        }
        let id = tables.allocate();
        let record = RoleRecord {
            id: RoleId::new(id),
            name: name.to_string(),
            permissions: permissions.clone(),
        };
        Ok(put(&mut tables.roles, record))
    }

    fn set_role_permissions(&self, name: &str, permissions: &PermissionMap) -> StoreResult<RoleRecord> {
        let mut tables = self.write()?;
        let record = tables
            .roles
            .values_mut()
            .find(|r| r.name == name)
            .ok_or_else(|| StoreError::not_found("role", name))?;
        record.permissions = permissions.clone();
        Ok(record.clone())
    }

    fn create_collaborator(&self, new: NewCollaborator) -> StoreResult<Collaborator> {
        let mut tables = self.write()?;
        let role_id = tables.role_named(&new.role_name)?.id;
        if tables.email_taken(new.email.as_str(), None) {
            return Err(StoreError::Conflict(format!(
                "a collaborator with email '{}' already exists",
                new.email
            )));
        }

        let id = tables.allocate();
        let collaborator = Collaborator {
            id: CollaboratorId::new(id),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            role_id,
            role_name: new.role_name,
        };
        Ok(put(&mut tables.collaborators, collaborator))
    }

    fn collaborator(&self, id: CollaboratorId) -> StoreResult<Option<Collaborator>> {
        Ok(self.read()?.collaborators.get(&id.get()).cloned())
    }

    fn collaborator_by_email(&self, email: &str) -> StoreResult<Option<Collaborator>> {
        let email = email.trim().to_lowercase();
        let tables = self.read()?;
        Ok(tables
            .collaborators
            .values()
            .find(|c| c.email.as_str() == email)
            .cloned())
    }

    fn list_collaborators(&self) -> StoreResult<Vec<Collaborator>> {
        Ok(self.read()?.collaborators.values().cloned().collect())
    }

    fn update_collaborator(&self, id: CollaboratorId, patch: &CollaboratorPatch) -> StoreResult<Collaborator> {
        let mut tables = self.write()?;
        let mut updated = tables
            .collaborators
            .get(&id.get())
            .cloned()
            .ok_or_else(|| StoreError::not_found("collaborator", id))?;

        patch.apply(&mut updated)?;
        if let Some(role_name) = &patch.role_name {
            updated.role_id = tables.role_named(role_name)?.id;
            updated.role_name = role_name.clone();
        }
        if tables.email_taken(updated.email.as_str(), Some(id.get())) {
            return Err(StoreError::Conflict(format!(
                "a collaborator with email '{}' already exists",
                updated.email
            )));
        }

        Ok(put(&mut tables.collaborators, updated))
    }

    fn delete_collaborator(&self, id: CollaboratorId) -> StoreResult<()> {
        let mut tables = self.write()?;
        tables.require_collaborator(id)?;
        if tables.contracts.values().any(|c| c.contact_commercial_id == id) {
            return Err(StoreError::Conflict(format!(
                "collaborator {id} still manages contracts"
            )));
        }

        for client in tables.clients.values_mut() {
            if client.contact_commercial_id == Some(id) {
                client.contact_commercial_id = None;
            }
        }
        for event in tables.events.values_mut() {
            if event.support_contact_id == Some(id) {
                event.support_contact_id = None;
            }
        }
        tables.collaborators.remove(&id.get());
        Ok(())
    }

    fn create_client(&self, new: NewClient) -> StoreResult<Client> {
        let mut tables = self.write()?;
        if let Some(owner) = new.contact_commercial_id {
            tables.require_collaborator(owner)?;
        }
        if tables.clients.values().any(|c| c.email == new.email) {
            return Err(StoreError::Conflict(format!(
                "a client with email '{}' already exists",
                new.email
            )));
        }

        let id = tables.allocate();
        let client = Client {
            id: ClientId::new(id),
            full_name: new.full_name,
            email: new.email,
            phone: new.phone,
            company: new.company,
            created_on: new.created_on,
            updated_on: None,
            contact_commercial_id: new.contact_commercial_id,
        };
        Ok(put(&mut tables.clients, client))
    }

    fn client(&self, id: ClientId) -> StoreResult<Option<Client>> {
        Ok(self.read()?.clients.get(&id.get()).cloned())
    }

    fn list_clients(&self) -> StoreResult<Vec<Client>> {
        Ok(self.read()?.clients.values().cloned().collect())
    }

    fn update_client(&self, id: ClientId, patch: &ClientPatch, today: NaiveDate) -> StoreResult<Client> {
        let mut tables = self.write()?;
        if let Some(owner) = patch.contact_commercial_id {
            tables.require_collaborator(owner)?;
        }
        let mut updated = tables
            .clients
            .get(&id.get())
            .cloned()
            .ok_or_else(|| StoreError::not_found("client", id))?;

        patch.apply(&mut updated, today)?;
        if tables.clients.values().any(|c| c.email == updated.email && c.id != id) {
            return Err(StoreError::Conflict(format!(
                "a client with email '{}' already exists",
                updated.email
            )));
        }

        Ok(put(&mut tables.clients, updated))
    }

    fn create_contract(&self, new: NewContract) -> StoreResult<Contract> {
        let mut tables = self.write()?;
        tables.require_client(new.client_id)?;
        tables.require_collaborator(new.contact_commercial_id)?;

        let id = tables.allocate();
        let contract = Contract {
            id: ContractId::new(id),
            client_id: new.client_id,
            contact_commercial_id: new.contact_commercial_id,
            total_amount: new.total_amount,
            remaining_amount: new.remaining_amount,
            created_on: new.created_on,
            signed: new.signed,
        };
        Ok(put(&mut tables.contracts, contract))
    }

    fn contract(&self, id: ContractId) -> StoreResult<Option<Contract>> {
        Ok(self.read()?.contracts.get(&id.get()).cloned())
    }

    fn list_contracts(&self) -> StoreResult<Vec<Contract>> {
        Ok(self.read()?.contracts.values().cloned().collect())
    }

    fn update_contract(&self, id: ContractId, patch: &ContractPatch) -> StoreResult<Contract> {
        let mut tables = self.write()?;
        if let Some(owner) = patch.contact_commercial_id {
            tables.require_collaborator(owner)?;
        }
        let contract = tables
            .contracts
            .get_mut(&id.get())
            .ok_or_else(|| StoreError::not_found("contract", id))?;

        let mut updated = contract.clone();
        patch.apply(&mut updated)?;
        *contract = updated.clone();
        Ok(updated)
    }

    fn delete_contract(&self, id: ContractId) -> StoreResult<()> {
        let mut tables = self.write()?;
        if !tables.contracts.contains_key(&id.get()) {
            return Err(StoreError::not_found("contract", id));
        }
        if tables.events.values().any(|e| e.contract_id == id) {
            return Err(StoreError::Conflict(format!("contract {id} still has events")));
        }
        tables.contracts.remove(&id.get());
        Ok(())
    }

    fn create_event(&self, new: NewEvent) -> StoreResult<Event> {
        let mut tables = self.write()?;
        let contract = tables
            .contracts
            .get(&new.contract_id.get())
            .ok_or_else(|| StoreError::not_found("contract", new.contract_id))?;
        if contract.client_id != new.client_id {
            return Err(StoreError::Validation(format!(
                "contract {} belongs to client {}, not {}",
                contract.id, contract.client_id, new.client_id
            )));
        }
        if let Some(support) = new.support_contact_id {
            tables.require_collaborator(support)?;
        }

        let id = tables.allocate();
        let event = Event {
            id: EventId::new(id),
            contract_id: new.contract_id,
            client_id: new.client_id,
            support_contact_id: new.support_contact_id,
            starts_at: new.starts_at,
            ends_at: new.ends_at,
            location: new.location,
            attendees: new.attendees,
            expected_attendees: new.expected_attendees,
            notes: new.notes,
        };
        Ok(put(&mut tables.events, event))
    }

    fn event(&self, id: EventId) -> StoreResult<Option<Event>> {
        Ok(self.read()?.events.get(&id.get()).cloned())
    }

    fn list_events(&self) -> StoreResult<Vec<Event>> {
        Ok(self.read()?.events.values().cloned().collect())
    }

    fn update_event(&self, id: EventId, patch: &EventPatch) -> StoreResult<Event> {
        let mut tables = self.write()?;
        if let Some(support) = patch.support_contact_id {
            tables.require_collaborator(support)?;
        }
        let event = tables
            .events
            .get_mut(&id.get())
            .ok_or_else(|| StoreError::not_found("event", id))?;

        let mut updated = event.clone();
        patch.apply(&mut updated)?;
        *event = updated.clone();
        Ok(updated)
    }
}
