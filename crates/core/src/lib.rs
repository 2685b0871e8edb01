//! `epiccrm-core`: CRM domain building blocks.
//!
//! This crate contains **pure domain** records and validation (no storage, no
//! authorization, no CLI concerns).

pub mod client;
pub mod collaborator;
pub mod contract;
pub mod entity;
pub mod error;
pub mod event;
pub mod id;
pub mod role;
pub mod value_object;

pub use client::{Client, ClientPatch, NewClient};
pub use collaborator::{Collaborator, CollaboratorPatch, NewCollaborator};
pub use contract::{Contract, ContractPatch, NewContract};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use event::{Event, EventPatch, NewEvent};
pub use id::{ClientId, CollaboratorId, ContractId, EventId, RoleId};
pub use role::{PermissionMap, RoleRecord};
pub use value_object::{Email, ValueObject};
