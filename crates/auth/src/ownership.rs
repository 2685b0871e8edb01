//! Row-level ownership rules layered on top of the role policy.
//!
//! The role policy says whether a role may update contracts at all; these
//! predicates decide whether *this* principal may touch *this* record. They
//! are pure: the caller loads the record first and aborts the command on a
//! denial.

use serde::Serialize;
use thiserror::Error;

use epiccrm_core::{Client, ClientId, CollaboratorId, Contract, ContractId, Event, EventId};

use crate::{AuthzError, Principal, RoleCatalog};

/// The guarded operation, for denial messages.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    CreateEvent,
    UpdateContract,
    UpdateEvent,
    AssignEventSupport,
    UpdateClient,
    ReassignClient,
    ReassignContract,
    DeleteCollaborator,
}

impl core::fmt::Display for Operation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Operation::CreateEvent => "create events",
            Operation::UpdateContract => "update contracts",
            Operation::UpdateEvent => "update events",
            Operation::AssignEventSupport => "assign support to events",
            Operation::UpdateClient => "update clients",
            Operation::ReassignClient => "hand clients to another commercial",
            Operation::ReassignContract => "hand contracts to another commercial",
            Operation::DeleteCollaborator => "delete collaborators",
        })
    }
}

/// Why a row-level check failed. Each reason has its own message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OwnershipDenial {
    #[error("role '{role}' cannot {operation}")]
    WrongRole { role: String, operation: Operation },

    #[error("contract not found")]
    ContractNotFound,

    #[error("event not found")]
    EventNotFound,

    #[error("cannot create an event for unsigned contract {0}")]
    UnsignedContract(ContractId),

    #[error("contract {contract} is managed by commercial #{owner}, not by you")]
    NotContractOwner {
        contract: ContractId,
        owner: CollaboratorId,
    },

    #[error("event {event} is not assigned to you")]
    NotEventSupport { event: EventId },

    #[error("client not found")]
    ClientNotFound,

    #[error("client {client} is followed by another commercial")]
    NotClientOwner { client: ClientId },

    #[error("you cannot delete your own account")]
    OwnAccount,
}

/// Outcome of an ownership predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnershipDecision {
    Allowed,
    Denied(OwnershipDenial),
}

impl OwnershipDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, OwnershipDecision::Allowed)
    }

    pub fn reason(&self) -> Option<&OwnershipDenial> {
        match self {
            OwnershipDecision::Allowed => None,
            OwnershipDecision::Denied(reason) => Some(reason),
        }
    }

    pub fn into_result(self) -> Result<(), AuthzError> {
        match self {
            OwnershipDecision::Allowed => Ok(()),
            OwnershipDecision::Denied(reason) => Err(AuthzError::Ownership(reason)),
        }
    }
}

/// Ownership predicates, parameterised by which role names fill the
/// management / sales / support slots.
#[derive(Debug, Clone, Default)]
pub struct OwnershipGuard {
    roles: RoleCatalog,
}

impl OwnershipGuard {
    pub fn new(roles: RoleCatalog) -> Self {
        Self { roles }
    }

    pub fn roles(&self) -> &RoleCatalog {
        &self.roles
    }

    /// Only the owning commercial may create an event, and only on a signed
    /// contract. Checks short-circuit in order: role, existence, signature,
    /// ownership.
    pub fn may_create_event(&self, principal: &Principal, contract: Option<&Contract>) -> OwnershipDecision {
        let decision = if !principal.has_role(&self.roles.sales) {
            self.wrong_role(principal, Operation::CreateEvent)
        } else {
            match contract {
                None => OwnershipDecision::Denied(OwnershipDenial::ContractNotFound),
                Some(c) if !c.signed => OwnershipDecision::Denied(OwnershipDenial::UnsignedContract(c.id)),
                Some(c) => owns_contract(principal, c),
            }
        };
        log_decision(principal, Operation::CreateEvent, decision)
    }

    /// Management may update any contract; a commercial only their own.
    pub fn may_update_contract(&self, principal: &Principal, contract: Option<&Contract>) -> OwnershipDecision {
        let decision = if principal.has_role(&self.roles.management) {
            OwnershipDecision::Allowed
        } else if !principal.has_role(&self.roles.sales) {
            self.wrong_role(principal, Operation::UpdateContract)
        } else {
            match contract {
                None => OwnershipDecision::Denied(OwnershipDenial::ContractNotFound),
                Some(c) => owns_contract(principal, c),
            }
        };
        log_decision(principal, Operation::UpdateContract, decision)
    }

    /// Only the assigned support collaborator may update an event. Management
    /// gets no bypass here, unlike contracts.
    pub fn may_update_event(&self, principal: &Principal, event: Option<&Event>) -> OwnershipDecision {
        let decision = if !principal.has_role(&self.roles.support) {
            self.wrong_role(principal, Operation::UpdateEvent)
        } else {
            match event {
                None => OwnershipDecision::Denied(OwnershipDenial::EventNotFound),
                Some(e) if e.support_contact_id == Some(principal.id) => OwnershipDecision::Allowed,
                Some(e) => OwnershipDecision::Denied(OwnershipDenial::NotEventSupport { event: e.id }),
            }
        };
        log_decision(principal, Operation::UpdateEvent, decision)
    }

    /// Only management hands events over to a support collaborator.
    pub fn may_assign_event_support(&self, principal: &Principal, event: Option<&Event>) -> OwnershipDecision {
        let decision = if !principal.has_role(&self.roles.management) {
            self.wrong_role(principal, Operation::AssignEventSupport)
        } else if event.is_none() {
            OwnershipDecision::Denied(OwnershipDenial::EventNotFound)
        } else {
            OwnershipDecision::Allowed
        };
        log_decision(principal, Operation::AssignEventSupport, decision)
    }

    /// Management may update any client; a commercial only the clients they
    /// follow.
    pub fn may_update_client(&self, principal: &Principal, client: Option<&Client>) -> OwnershipDecision {
        let decision = if principal.has_role(&self.roles.management) {
            OwnershipDecision::Allowed
        } else if !principal.has_role(&self.roles.sales) {
            self.wrong_role(principal, Operation::UpdateClient)
        } else {
            match client {
                None => OwnershipDecision::Denied(OwnershipDenial::ClientNotFound),
                Some(c) if c.contact_commercial_id == Some(principal.id) => OwnershipDecision::Allowed,
                Some(c) => OwnershipDecision::Denied(OwnershipDenial::NotClientOwner { client: c.id }),
            }
        };
        log_decision(principal, Operation::UpdateClient, decision)
    }

    /// Changing which commercial follows a client or manages a contract is
    /// reserved to management, on top of the usual update rules.
    pub fn may_reassign_commercial(&self, principal: &Principal, operation: Operation) -> OwnershipDecision {
        let decision = if principal.has_role(&self.roles.management) {
            OwnershipDecision::Allowed
        } else {
            self.wrong_role(principal, operation)
        };
        log_decision(principal, operation, decision)
    }

    /// Nobody deletes their own account.
    pub fn may_delete_collaborator(&self, principal: &Principal, target: CollaboratorId) -> OwnershipDecision {
        let decision = if principal.id == target {
            OwnershipDecision::Denied(OwnershipDenial::OwnAccount)
        } else {
            OwnershipDecision::Allowed
        };
        log_decision(principal, Operation::DeleteCollaborator, decision)
    }

    fn wrong_role(&self, principal: &Principal, operation: Operation) -> OwnershipDecision {
        OwnershipDecision::Denied(OwnershipDenial::WrongRole {
            role: principal.role.to_string(),
            operation,
        })
    }
}

fn owns_contract(principal: &Principal, contract: &Contract) -> OwnershipDecision {
    if contract.contact_commercial_id == principal.id {
        OwnershipDecision::Allowed
    } else {
        OwnershipDecision::Denied(OwnershipDenial::NotContractOwner {
            contract: contract.id,
            owner: contract.contact_commercial_id,
        })
    }
}

fn log_decision(principal: &Principal, operation: Operation, decision: OwnershipDecision) -> OwnershipDecision {
    if let OwnershipDecision::Denied(reason) = &decision {
        tracing::info!(principal = %principal, %operation, %reason, "ownership check denied");
    }
    decision
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn principal(id: i64, role: Role) -> Principal {
        Principal::new(CollaboratorId::new(id), format!("user{id}@example.com"), role)
    }

    fn contract(owner: i64, signed: bool) -> Contract {
        Contract {
            id: ContractId::new(10),
            client_id: ClientId::new(5),
            contact_commercial_id: CollaboratorId::new(owner),
            total_amount: 1_000.0,
            remaining_amount: 500.0,
            created_on: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            signed,
        }
    }

    fn event(support: Option<i64>) -> Event {
        let day = NaiveDate::from_ymd_opt(2025, 6, 4).unwrap();
        Event {
            id: EventId::new(20),
            contract_id: ContractId::new(10),
            client_id: ClientId::new(5),
            support_contact_id: support.map(CollaboratorId::new),
            starts_at: day.and_hms_opt(13, 0, 0).unwrap(),
            ends_at: day.and_hms_opt(18, 0, 0).unwrap(),
            location: "Candé-sur-Beuvron".to_string(),
            attendees: 75,
            expected_attendees: None,
            notes: None,
        }
    }

    fn client(owner: Option<i64>) -> Client {
        Client {
            id: ClientId::new(5),
            full_name: "Kevin Casey".to_string(),
            email: epiccrm_core::Email::parse("kevin@startup.io").unwrap(),
            phone: "+33 6 12 34 56 78".to_string(),
            company: "Cool Startup LLC".to_string(),
            created_on: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            updated_on: None,
            contact_commercial_id: owner.map(CollaboratorId::new),
        }
    }

    fn guard() -> OwnershipGuard {
        OwnershipGuard::default()
    }

    // ── event creation ──────────────────────────────────────────────────────

    #[test]
    fn owner_may_create_event_on_signed_contract() {
        let c = contract(1, true);
        assert!(guard().may_create_event(&principal(1, Role::COMMERCIAL), Some(&c)).is_allowed());
    }

    #[test]
    fn unsigned_contract_blocks_event_creation() {
        let c = contract(1, false);
        let decision = guard().may_create_event(&principal(1, Role::COMMERCIAL), Some(&c));

        assert_eq!(
            decision,
            OwnershipDecision::Denied(OwnershipDenial::UnsignedContract(ContractId::new(10)))
        );
        assert!(decision.reason().unwrap().to_string().contains("unsigned contract"));
    }

    #[test]
    fn event_creation_reasons_are_distinguishable() {
        let g = guard();
        let commercial = principal(2, Role::COMMERCIAL);

        let missing = g.may_create_event(&commercial, None);
        let unsigned = g.may_create_event(&commercial, Some(&contract(1, false)));
        let foreign = g.may_create_event(&commercial, Some(&contract(1, true)));
        let support = g.may_create_event(&principal(1, Role::SUPPORT), Some(&contract(1, true)));

        assert_eq!(missing.reason(), Some(&OwnershipDenial::ContractNotFound));
        assert!(matches!(unsigned.reason(), Some(OwnershipDenial::UnsignedContract(_))));
        assert!(matches!(foreign.reason(), Some(OwnershipDenial::NotContractOwner { .. })));
        assert!(matches!(support.reason(), Some(OwnershipDenial::WrongRole { .. })));
    }

    #[test]
    fn gestion_cannot_create_events() {
        let decision = guard().may_create_event(&principal(1, Role::GESTION), Some(&contract(1, true)));
        assert!(!decision.is_allowed());
    }

    // ── contract update ─────────────────────────────────────────────────────

    #[test]
    fn commercial_cannot_update_someone_elses_contract() {
        let decision = guard().may_update_contract(&principal(2, Role::COMMERCIAL), Some(&contract(1, true)));
        assert_eq!(
            decision,
            OwnershipDecision::Denied(OwnershipDenial::NotContractOwner {
                contract: ContractId::new(10),
                owner: CollaboratorId::new(1),
            })
        );
    }

    #[test]
    fn support_cannot_update_contracts() {
        let decision = guard().may_update_contract(&principal(1, Role::SUPPORT), Some(&contract(1, true)));
        assert!(matches!(decision.reason(), Some(OwnershipDenial::WrongRole { .. })));
    }

    #[test]
    fn missing_contract_is_denied_for_commercial() {
        let decision = guard().may_update_contract(&principal(1, Role::COMMERCIAL), None);
        assert_eq!(decision.reason(), Some(&OwnershipDenial::ContractNotFound));
    }

    // ── event update ────────────────────────────────────────────────────────

    #[test]
    fn assigned_support_may_update_event() {
        let e = event(Some(1));
        assert!(guard().may_update_event(&principal(1, Role::SUPPORT), Some(&e)).is_allowed());
    }

    #[test]
    fn unassigned_or_foreign_event_is_denied_for_support() {
        let g = guard();
        let support = principal(1, Role::SUPPORT);
        assert!(!g.may_update_event(&support, Some(&event(None))).is_allowed());
        assert!(!g.may_update_event(&support, Some(&event(Some(2)))).is_allowed());
        assert_eq!(
            g.may_update_event(&support, None).reason(),
            Some(&OwnershipDenial::EventNotFound)
        );
    }

    #[test]
    fn gestion_gets_no_bypass_on_event_update() {
        let decision = guard().may_update_event(&principal(1, Role::GESTION), Some(&event(Some(1))));
        assert!(matches!(decision.reason(), Some(OwnershipDenial::WrongRole { .. })));
    }

    #[test]
    fn only_management_assigns_support() {
        let g = guard();
        let e = event(None);
        assert!(g.may_assign_event_support(&principal(1, Role::GESTION), Some(&e)).is_allowed());
        assert!(!g.may_assign_event_support(&principal(1, Role::SUPPORT), Some(&e)).is_allowed());
        assert_eq!(
            g.may_assign_event_support(&principal(1, Role::GESTION), None).reason(),
            Some(&OwnershipDenial::EventNotFound)
        );
    }

    // ── client update ───────────────────────────────────────────────────────

    #[test]
    fn client_update_rules() {
        let g = guard();
        let owned = client(Some(1));

        assert!(g.may_update_client(&principal(9, Role::GESTION), Some(&owned)).is_allowed());
        assert!(g.may_update_client(&principal(1, Role::COMMERCIAL), Some(&owned)).is_allowed());
        assert!(!g.may_update_client(&principal(2, Role::COMMERCIAL), Some(&owned)).is_allowed());
        assert!(!g.may_update_client(&principal(1, Role::COMMERCIAL), Some(&client(None))).is_allowed());
        assert!(!g.may_update_client(&principal(1, Role::SUPPORT), Some(&owned)).is_allowed());
    }

    #[test]
    fn missing_client_is_its_own_denial() {
        let decision = guard().may_update_client(&principal(1, Role::COMMERCIAL), None);
        assert_eq!(decision.reason(), Some(&OwnershipDenial::ClientNotFound));
    }

    #[test]
    fn denial_converts_to_permission_error() {
        let err = guard()
            .may_update_client(&principal(2, Role::COMMERCIAL), Some(&client(Some(1))))
            .into_result()
            .unwrap_err();
        assert_eq!(err.to_string(), "permission denied: client 5 is followed by another commercial");
    }

    #[test]
    fn only_management_reassigns_commercials() {
        let g = guard();
        assert!(g.may_reassign_commercial(&principal(9, Role::GESTION), Operation::ReassignContract).is_allowed());

        let err = g
            .may_reassign_commercial(&principal(1, Role::COMMERCIAL), Operation::ReassignContract)
            .into_result()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "permission denied: role 'commercial' cannot hand contracts to another commercial"
        );
        assert!(!g.may_reassign_commercial(&principal(1, Role::SUPPORT), Operation::ReassignClient).is_allowed());
    }

    #[test]
    fn own_account_cannot_be_deleted() {
        let g = guard();
        let me = principal(3, Role::GESTION);
        assert_eq!(
            g.may_delete_collaborator(&me, CollaboratorId::new(3)).reason(),
            Some(&OwnershipDenial::OwnAccount)
        );
        assert!(g.may_delete_collaborator(&me, CollaboratorId::new(4)).is_allowed());
    }

    #[test]
    fn custom_catalog_renames_slots() {
        let g = OwnershipGuard::new(RoleCatalog {
            management: Role::from("manager"),
            sales: Role::from("sales"),
            support: Role::from("ops"),
        });
        let c = contract(4, true);

        assert!(g.may_update_contract(&principal(1, Role::from("manager")), Some(&c)).is_allowed());
        assert!(!g.may_update_contract(&principal(1, Role::GESTION), Some(&c)).is_allowed());
        assert!(g.may_create_event(&principal(4, Role::from("sales")), Some(&c)).is_allowed());
    }

    proptest! {
        /// Property: management may always update a contract, whoever owns it.
        #[test]
        fn gestion_always_updates_contracts(owner in 1i64..1_000, me in 1i64..1_000, signed: bool) {
            let c = contract(owner, signed);
            prop_assert!(guard().may_update_contract(&principal(me, Role::GESTION), Some(&c)).is_allowed());
        }

        /// Property: a commercial may update a contract iff they own it.
        #[test]
        fn commercial_updates_iff_owner(owner in 1i64..1_000, me in 1i64..1_000) {
            let c = contract(owner, true);
            let allowed = guard().may_update_contract(&principal(me, Role::COMMERCIAL), Some(&c)).is_allowed();
            prop_assert_eq!(allowed, owner == me);
        }
    }
}
