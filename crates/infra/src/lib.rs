//! Infrastructure layer: the CRM store, its Postgres adapter, and bootstrap.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use bootstrap::{initialize, load_policy, seed_roles};
pub use config::DatabaseConfig;
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::CrmStore;
