//! Postgres-backed CRM store.
//!
//! The store owns a current-thread tokio runtime and blocks on it for every
//! call, so callers stay synchronous.
//!
//! ## Error mapping
//!
//! | sqlx error | Postgres code | `StoreError` |
//! |---|---|---|
//! | `Database` | `23505` (unique) | `Conflict` |
//! | `Database` | `23503` (foreign key) | `Conflict` |
//! | `Database` | `23514` (check) | `Validation` |
//! | anything else | | `Backend` |

use std::future::Future;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tokio::runtime::Runtime;

use epiccrm_auth::{Credential, CredentialStore};
use epiccrm_core::{
    Client, ClientId, ClientPatch, Collaborator, CollaboratorId, CollaboratorPatch, Contract, ContractId,
    ContractPatch, Email, Event, EventId, EventPatch, NewClient, NewCollaborator, NewContract, NewEvent,
    PermissionMap, RoleId, RoleRecord,
};

use crate::bootstrap::SCHEMA;
use crate::store::credential_for;
use crate::{CrmStore, DatabaseConfig, StoreError, StoreResult};

const COLLABORATOR_SELECT: &str = r#"
    SELECT c.id, c.name, c.email, c.password_hash, c.role_id, r.name AS role_name
    FROM collaborators c
    JOIN roles r ON r.id = c.role_id
"#;

const CLIENT_COLUMNS: &str =
    "id, full_name, email, phone, company, created_on, updated_on, contact_commercial_id";

const CONTRACT_COLUMNS: &str =
    "id, client_id, contact_commercial_id, total_amount, remaining_amount, created_on, signed";

const EVENT_COLUMNS: &str = "id, contract_id, client_id, support_contact_id, starts_at, ends_at, location, \
     attendees, expected_attendees, notes";

pub struct PostgresStore {
    runtime: Runtime,
    pool: PgPool,
}

impl PostgresStore {
    /// Connect using `config`. Fails fast if the server is unreachable.
    pub fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StoreError::Backend(format!("failed to start runtime: {e}")))?;

        let pool = runtime
            .block_on(
                PgPoolOptions::new()
                    .max_connections(2)
                    .acquire_timeout(Duration::from_secs(5))
                    .connect(config.url()),
            )
            .map_err(|e| map_sqlx_error("connect", e))?;

        tracing::debug!(?config, "connected to postgres");
        Ok(Self { runtime, pool })
    }

    fn run<F: Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }

    async fn begin(&self) -> StoreResult<Transaction<'static, Postgres>> {
        self.pool.begin().await.map_err(|e| map_sqlx_error("begin", e))
    }
}

impl core::fmt::Debug for PostgresStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PostgresStore").finish_non_exhaustive()
    }
}

impl CredentialStore for PostgresStore {
    type Error = StoreError;

    fn find_credential(&self, email: &str) -> StoreResult<Option<Credential>> {
        credential_for(self, email)
    }
}

impl CrmStore for PostgresStore {
    fn ensure_schema(&self) -> StoreResult<()> {
        self.run(async {
            sqlx::raw_sql(SCHEMA)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))
        })?;
        tracing::debug!("schema ensured");
        Ok(())
    }

    // ── roles ───────────────────────────────────────────────────────────────

    fn role_by_name(&self, name: &str) -> StoreResult<Option<RoleRecord>> {
        self.run(async {
            let row = sqlx::query("SELECT id, name, permissions FROM roles WHERE name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("role_by_name", e))?;
            row.as_ref().map(role_from_row).transpose()
        })
    }

    fn list_roles(&self) -> StoreResult<Vec<RoleRecord>> {
        self.run(async {
            let rows = sqlx::query("SELECT id, name, permissions FROM roles ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("list_roles", e))?;
            rows.iter().map(role_from_row).collect()
        })
    }

    fn create_role(&self, name: &str, permissions: &PermissionMap) -> StoreResult<RoleRecord> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::Validation("role name cannot be empty".to_string()));
        }
        self.run(async {
            let row = sqlx::query("INSERT INTO roles (name, permissions) VALUES ($1, $2) RETURNING id, name, permissions")
                .bind(name)
                .bind(Json(permissions))
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("create_role", e))?;
            role_from_row(&row)
        })
    }

    fn set_role_permissions(&self, name: &str, permissions: &PermissionMap) -> StoreResult<RoleRecord> {
        self.run(async {
            let row = sqlx::query(
                "UPDATE roles SET permissions = $2 WHERE name = $1 RETURNING id, name, permissions",
            )
            .bind(name)
            .bind(Json(permissions))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_role_permissions", e))?;
            match row {
                Some(row) => role_from_row(&row),
                None => Err(StoreError::not_found("role", name)),
            }
        })
    }

    // ── collaborators ───────────────────────────────────────────────────────

    fn create_collaborator(&self, new: NewCollaborator) -> StoreResult<Collaborator> {
        self.run(async move {
            let role = sqlx::query("SELECT id FROM roles WHERE name = $1")
                .bind(&new.role_name)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("create_collaborator", e))?
                .ok_or_else(|| StoreError::Validation(format!("unknown role '{}'", new.role_name)))?;
            let role_id: i64 = role.try_get("id").map_err(|e| decode_error("roles", e))?;

            let row = sqlx::query(
                r#"
                INSERT INTO collaborators (name, email, password_hash, role_id)
                VALUES ($1, $2, $3, $4)
                RETURNING id
                "#,
            )
            .bind(&new.name)
            .bind(new.email.as_str())
            .bind(&new.password_hash)
            .bind(role_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_collaborator", e))?;
            let id: i64 = row.try_get("id").map_err(|e| decode_error("collaborators", e))?;

            Ok(Collaborator {
                id: CollaboratorId::new(id),
                name: new.name,
                email: new.email,
                password_hash: new.password_hash,
                role_id: RoleId::new(role_id),
                role_name: new.role_name,
            })
        })
    }

    fn collaborator(&self, id: CollaboratorId) -> StoreResult<Option<Collaborator>> {
        self.run(async {
            let row = sqlx::query(&format!("{COLLABORATOR_SELECT} WHERE c.id = $1"))
                .bind(id.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("collaborator", e))?;
            row.as_ref().map(collaborator_from_row).transpose()
        })
    }

    fn collaborator_by_email(&self, email: &str) -> StoreResult<Option<Collaborator>> {
        let email = email.trim().to_lowercase();
        self.run(async {
            let row = sqlx::query(&format!("{COLLABORATOR_SELECT} WHERE c.email = $1"))
                .bind(&email)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("collaborator_by_email", e))?;
            row.as_ref().map(collaborator_from_row).transpose()
        })
    }

    fn list_collaborators(&self) -> StoreResult<Vec<Collaborator>> {
        self.run(async {
            let rows = sqlx::query(&format!("{COLLABORATOR_SELECT} ORDER BY c.id"))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("list_collaborators", e))?;
            rows.iter().map(collaborator_from_row).collect()
        })
    }

    fn update_collaborator(&self, id: CollaboratorId, patch: &CollaboratorPatch) -> StoreResult<Collaborator> {
        self.run(async {
            let mut tx = self.begin().await?;

            let row = sqlx::query(&format!("{COLLABORATOR_SELECT} WHERE c.id = $1 FOR UPDATE OF c"))
                .bind(id.get())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("update_collaborator", e))?
                .ok_or_else(|| StoreError::not_found("collaborator", id))?;
            let mut updated = collaborator_from_row(&row)?;

            patch.apply(&mut updated)?;
            if let Some(role_name) = &patch.role_name {
                let role = sqlx::query("SELECT id FROM roles WHERE name = $1")
                    .bind(role_name)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("update_collaborator", e))?
                    .ok_or_else(|| StoreError::Validation(format!("unknown role '{role_name}'")))?;
                let role_id: i64 = role.try_get("id").map_err(|e| decode_error("roles", e))?;
                updated.role_id = RoleId::new(role_id);
                updated.role_name = role_name.clone();
            }

            sqlx::query(
                "UPDATE collaborators SET name = $2, email = $3, password_hash = $4, role_id = $5 WHERE id = $1",
            )
            .bind(id.get())
            .bind(&updated.name)
            .bind(updated.email.as_str())
            .bind(&updated.password_hash)
            .bind(updated.role_id.get())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_collaborator", e))?;

            tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
            Ok(updated)
        })
    }

    fn delete_collaborator(&self, id: CollaboratorId) -> StoreResult<()> {
        self.run(async {
            let result = sqlx::query("DELETE FROM collaborators WHERE id = $1")
                .bind(id.get())
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("delete_collaborator", e))?;
            if result.rows_affected() == 0 {
                return Err(StoreError::not_found("collaborator", id));
            }
            Ok(())
        })
    }

    // ── clients ─────────────────────────────────────────────────────────────

    fn create_client(&self, new: NewClient) -> StoreResult<Client> {
        self.run(async {
            let row = sqlx::query(&format!(
                r#"
                INSERT INTO clients (full_name, email, phone, company, created_on, contact_commercial_id)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING {CLIENT_COLUMNS}
                "#
            ))
            .bind(&new.full_name)
            .bind(new.email.as_str())
            .bind(&new.phone)
            .bind(&new.company)
            .bind(new.created_on)
            .bind(new.contact_commercial_id.map(CollaboratorId::get))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_client", e))?;
            client_from_row(&row)
        })
    }

    fn client(&self, id: ClientId) -> StoreResult<Option<Client>> {
        self.run(async {
            let row = sqlx::query(&format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1"))
                .bind(id.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("client", e))?;
            row.as_ref().map(client_from_row).transpose()
        })
    }

    fn list_clients(&self) -> StoreResult<Vec<Client>> {
        self.run(async {
            let rows = sqlx::query(&format!("SELECT {CLIENT_COLUMNS} FROM clients ORDER BY id"))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("list_clients", e))?;
            rows.iter().map(client_from_row).collect()
        })
    }

    fn update_client(&self, id: ClientId, patch: &ClientPatch, today: NaiveDate) -> StoreResult<Client> {
        self.run(async {
            let mut tx = self.begin().await?;

            let row = sqlx::query(&format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1 FOR UPDATE"))
                .bind(id.get())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("update_client", e))?
                .ok_or_else(|| StoreError::not_found("client", id))?;
            let mut updated = client_from_row(&row)?;
            patch.apply(&mut updated, today)?;

            sqlx::query(
                r#"
                UPDATE clients
                SET full_name = $2, email = $3, phone = $4, company = $5,
                    updated_on = $6, contact_commercial_id = $7
                WHERE id = $1
                "#,
            )
            .bind(id.get())
            .bind(&updated.full_name)
            .bind(updated.email.as_str())
            .bind(&updated.phone)
            .bind(&updated.company)
            .bind(updated.updated_on)
            .bind(updated.contact_commercial_id.map(CollaboratorId::get))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_client", e))?;

            tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
            Ok(updated)
        })
    }

    // ── contracts ───────────────────────────────────────────────────────────

    fn create_contract(&self, new: NewContract) -> StoreResult<Contract> {
        self.run(async {
            let row = sqlx::query(&format!(
                r#"
                INSERT INTO contracts (client_id, contact_commercial_id, total_amount, remaining_amount, created_on, signed)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING {CONTRACT_COLUMNS}
                "#
            ))
            .bind(new.client_id.get())
            .bind(new.contact_commercial_id.get())
            .bind(new.total_amount)
            .bind(new.remaining_amount)
            .bind(new.created_on)
            .bind(new.signed)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_contract", e))?;
            contract_from_row(&row)
        })
    }

    fn contract(&self, id: ContractId) -> StoreResult<Option<Contract>> {
        self.run(async {
            let row = sqlx::query(&format!("SELECT {CONTRACT_COLUMNS} FROM contracts WHERE id = $1"))
                .bind(id.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("contract", e))?;
            row.as_ref().map(contract_from_row).transpose()
        })
    }

    fn list_contracts(&self) -> StoreResult<Vec<Contract>> {
        self.run(async {
            let rows = sqlx::query(&format!("SELECT {CONTRACT_COLUMNS} FROM contracts ORDER BY id"))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("list_contracts", e))?;
            rows.iter().map(contract_from_row).collect()
        })
    }

    fn update_contract(&self, id: ContractId, patch: &ContractPatch) -> StoreResult<Contract> {
        self.run(async {
            let mut tx = self.begin().await?;

            let row = sqlx::query(&format!("SELECT {CONTRACT_COLUMNS} FROM contracts WHERE id = $1 FOR UPDATE"))
                .bind(id.get())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("update_contract", e))?
                .ok_or_else(|| StoreError::not_found("contract", id))?;
            let mut updated = contract_from_row(&row)?;
            patch.apply(&mut updated)?;

            sqlx::query(
                r#"
                UPDATE contracts
                SET total_amount = $2, remaining_amount = $3, signed = $4, contact_commercial_id = $5
                WHERE id = $1
                "#,
            )
            .bind(id.get())
            .bind(updated.total_amount)
            .bind(updated.remaining_amount)
            .bind(updated.signed)
            .bind(updated.contact_commercial_id.get())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_contract", e))?;

            tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
            Ok(updated)
        })
    }

    fn delete_contract(&self, id: ContractId) -> StoreResult<()> {
        self.run(async {
            let result = sqlx::query("DELETE FROM contracts WHERE id = $1")
                .bind(id.get())
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("delete_contract", e))?;
            if result.rows_affected() == 0 {
                return Err(StoreError::not_found("contract", id));
            }
            Ok(())
        })
    }

    // ── events ──────────────────────────────────────────────────────────────

    fn create_event(&self, new: NewEvent) -> StoreResult<Event> {
        let attendees = to_db_count("attendees", new.attendees)?;
        let expected = new
            .expected_attendees
            .map(|n| to_db_count("expected attendees", n))
            .transpose()?;

        self.run(async {
            let contract = sqlx::query("SELECT client_id FROM contracts WHERE id = $1")
                .bind(new.contract_id.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("create_event", e))?
                .ok_or_else(|| StoreError::not_found("contract", new.contract_id))?;
            let client_id: i64 = contract.try_get("client_id").map_err(|e| decode_error("contracts", e))?;
            if client_id != new.client_id.get() {
                return Err(StoreError::Validation(format!(
                    "contract {} belongs to client {}, not {}",
                    new.contract_id, client_id, new.client_id
                )));
            }

            let row = sqlx::query(&format!(
                r#"
                INSERT INTO events (contract_id, client_id, support_contact_id, starts_at, ends_at,
                                    location, attendees, expected_attendees, notes)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING {EVENT_COLUMNS}
                "#
            ))
            .bind(new.contract_id.get())
            .bind(new.client_id.get())
            .bind(new.support_contact_id.map(CollaboratorId::get))
            .bind(new.starts_at)
            .bind(new.ends_at)
            .bind(&new.location)
            .bind(attendees)
            .bind(expected)
            .bind(&new.notes)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_event", e))?;
            event_from_row(&row)
        })
    }

    fn event(&self, id: EventId) -> StoreResult<Option<Event>> {
        self.run(async {
            let row = sqlx::query(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
                .bind(id.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("event", e))?;
            row.as_ref().map(event_from_row).transpose()
        })
    }

    fn list_events(&self) -> StoreResult<Vec<Event>> {
        self.run(async {
            let rows = sqlx::query(&format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY id"))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("list_events", e))?;
            rows.iter().map(event_from_row).collect()
        })
    }

    fn update_event(&self, id: EventId, patch: &EventPatch) -> StoreResult<Event> {
        self.run(async {
            let mut tx = self.begin().await?;

            let row = sqlx::query(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 FOR UPDATE"))
                .bind(id.get())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("update_event", e))?
                .ok_or_else(|| StoreError::not_found("event", id))?;
            let mut updated = event_from_row(&row)?;
            patch.apply(&mut updated)?;

            let attendees = to_db_count("attendees", updated.attendees)?;
            let expected = updated
                .expected_attendees
                .map(|n| to_db_count("expected attendees", n))
                .transpose()?;

            sqlx::query(
                r#"
                UPDATE events
                SET support_contact_id = $2, starts_at = $3, ends_at = $4, location = $5,
                    attendees = $6, expected_attendees = $7, notes = $8
                WHERE id = $1
                "#,
            )
            .bind(id.get())
            .bind(updated.support_contact_id.map(CollaboratorId::get))
            .bind(updated.starts_at)
            .bind(updated.ends_at)
            .bind(&updated.location)
            .bind(attendees)
            .bind(expected)
            .bind(&updated.notes)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_event", e))?;

            tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
            Ok(updated)
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row decoding
// ─────────────────────────────────────────────────────────────────────────────

fn decode_error(table: &str, err: sqlx::Error) -> StoreError {
    StoreError::Backend(format!("failed to decode {table} row: {err}"))
}

fn stored_email(table: &str, raw: &str) -> StoreResult<Email> {
    Email::parse(raw).map_err(|e| StoreError::Backend(format!("corrupt email in {table}: {e}")))
}

fn to_db_count(field: &str, value: u32) -> StoreResult<i32> {
    i32::try_from(value).map_err(|_| StoreError::Validation(format!("{field} is too large: {value}")))
}

fn from_db_count(value: i32) -> StoreResult<u32> {
    u32::try_from(value).map_err(|_| StoreError::Backend(format!("negative count in events row: {value}")))
}

fn role_from_row(row: &PgRow) -> StoreResult<RoleRecord> {
    let decode = |e| decode_error("roles", e);
    let permissions: Json<PermissionMap> = row.try_get("permissions").map_err(decode)?;
    Ok(RoleRecord {
        id: RoleId::new(row.try_get("id").map_err(decode)?),
        name: row.try_get("name").map_err(decode)?,
        permissions: permissions.0,
    })
}

fn collaborator_from_row(row: &PgRow) -> StoreResult<Collaborator> {
    let decode = |e| decode_error("collaborators", e);
    let email: String = row.try_get("email").map_err(decode)?;
    Ok(Collaborator {
        id: CollaboratorId::new(row.try_get("id").map_err(decode)?),
        name: row.try_get("name").map_err(decode)?,
        email: stored_email("collaborators", &email)?,
        password_hash: row.try_get("password_hash").map_err(decode)?,
        role_id: RoleId::new(row.try_get("role_id").map_err(decode)?),
        role_name: row.try_get("role_name").map_err(decode)?,
    })
}

fn client_from_row(row: &PgRow) -> StoreResult<Client> {
    let decode = |e| decode_error("clients", e);
    let email: String = row.try_get("email").map_err(decode)?;
    let owner: Option<i64> = row.try_get("contact_commercial_id").map_err(decode)?;
    Ok(Client {
        id: ClientId::new(row.try_get("id").map_err(decode)?),
        full_name: row.try_get("full_name").map_err(decode)?,
        email: stored_email("clients", &email)?,
        phone: row.try_get("phone").map_err(decode)?,
        company: row.try_get("company").map_err(decode)?,
        created_on: row.try_get::<NaiveDate, _>("created_on").map_err(decode)?,
        updated_on: row.try_get::<Option<NaiveDate>, _>("updated_on").map_err(decode)?,
        contact_commercial_id: owner.map(CollaboratorId::new),
    })
}

fn contract_from_row(row: &PgRow) -> StoreResult<Contract> {
    let decode = |e| decode_error("contracts", e);
    Ok(Contract {
        id: ContractId::new(row.try_get("id").map_err(decode)?),
        client_id: ClientId::new(row.try_get("client_id").map_err(decode)?),
        contact_commercial_id: CollaboratorId::new(row.try_get("contact_commercial_id").map_err(decode)?),
        total_amount: row.try_get("total_amount").map_err(decode)?,
        remaining_amount: row.try_get("remaining_amount").map_err(decode)?,
        created_on: row.try_get::<NaiveDate, _>("created_on").map_err(decode)?,
        signed: row.try_get("signed").map_err(decode)?,
    })
}

fn event_from_row(row: &PgRow) -> StoreResult<Event> {
    let decode = |e| decode_error("events", e);
    let support: Option<i64> = row.try_get("support_contact_id").map_err(decode)?;
    let attendees: i32 = row.try_get("attendees").map_err(decode)?;
    let expected: Option<i32> = row.try_get("expected_attendees").map_err(decode)?;
    Ok(Event {
        id: EventId::new(row.try_get("id").map_err(decode)?),
        contract_id: ContractId::new(row.try_get("contract_id").map_err(decode)?),
        client_id: ClientId::new(row.try_get("client_id").map_err(decode)?),
        support_contact_id: support.map(CollaboratorId::new),
        starts_at: row.try_get::<NaiveDateTime, _>("starts_at").map_err(decode)?,
        ends_at: row.try_get::<NaiveDateTime, _>("ends_at").map_err(decode)?,
        location: row.try_get("location").map_err(decode)?,
        attendees: from_db_count(attendees)?,
        expected_attendees: expected.map(from_db_count).transpose()?,
        notes: row.try_get("notes").map_err(decode)?,
    })
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("{operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("23503") => StoreError::Conflict(msg),
                Some("23514") => StoreError::Validation(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {operation}")),
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}
