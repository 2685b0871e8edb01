//! Command-line surface.

use std::path::PathBuf;

use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand};

use epiccrm_auth::{Action, DEFAULT_TOKEN_TTL_MINUTES, Permission, PolicySource, Resource};
use epiccrm_core::{ClientId, CollaboratorId, ContractId, EventId};
use epiccrm_observability::LogFormat;

/// Epic Events CRM.
#[derive(Parser, Debug)]
#[command(name = "epiccrm", version, about = "Epic Events CRM command line")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Secret used to sign session tokens.
    #[arg(long, env = "SECRET_KEY", hide_env_values = true)]
    pub secret_key: String,

    /// Postgres URL. Falls back to DB_USER / DB_PASSWORD / DB_HOST / DB_PORT / DB_NAME.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Where the session token is kept.
    #[arg(long, env = "CRM_TOKEN_FILE", default_value = epiccrm_auth::session::DEFAULT_TOKEN_FILE)]
    pub token_file: PathBuf,

    /// Session lifetime in minutes.
    #[arg(long, env = "CRM_TOKEN_TTL_MINUTES", default_value_t = DEFAULT_TOKEN_TTL_MINUTES)]
    pub token_ttl_minutes: i64,

    /// `builtin` (compiled-in table) or `store` (role records).
    #[arg(long, env = "CRM_POLICY_SOURCE", default_value = "builtin")]
    pub policy_source: PolicySource,

    /// `text` or `json`.
    #[arg(long, env = "CRM_LOG_FORMAT", default_value = "text")]
    pub log_format: LogFormat,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Log in, log out, show the current session.
    #[command(subcommand)]
    Auth(AuthCommand),

    /// Database setup and raw table reads.
    #[command(subcommand)]
    Db(DbCommand),

    /// Manage staff accounts.
    #[command(subcommand)]
    Collaborator(CollaboratorCommand),

    /// Manage clients.
    #[command(subcommand)]
    Client(ClientCommand),

    /// Manage contracts.
    #[command(subcommand)]
    Contract(ContractCommand),

    /// Manage events.
    #[command(subcommand)]
    Event(EventCommand),

    /// Inspect the permission policy.
    #[command(subcommand)]
    Role(RoleCommand),
}

// ── auth ────────────────────────────────────────────────────────────────────

#[derive(Subcommand, Debug, Clone)]
pub enum AuthCommand {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "CRM_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    Whoami,
}

// ── db ──────────────────────────────────────────────────────────────────────

#[derive(Subcommand, Debug, Clone)]
pub enum DbCommand {
    /// Create tables and seed the role catalog. Needs no session.
    Init,
    /// Dump a table the current role may read.
    Read {
        /// collaborator, client, contract, event or role (plurals accepted).
        table: Resource,
    },
}

// ── collaborators ───────────────────────────────────────────────────────────

#[derive(Subcommand, Debug, Clone)]
pub enum CollaboratorCommand {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        role: String,
    },
    List,
    Update {
        id: CollaboratorId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        role: Option<String>,
    },
    Delete {
        id: CollaboratorId,
    },
}

// ── clients ─────────────────────────────────────────────────────────────────

#[derive(Subcommand, Debug, Clone)]
pub enum ClientCommand {
    Create {
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        company: String,
        /// Owning commercial. Ignored when a commercial creates the client.
        #[arg(long)]
        commercial: Option<CollaboratorId>,
    },
    List {
        /// Only clients I follow.
        #[arg(long)]
        mine: bool,
    },
    Update {
        id: ClientId,
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        company: Option<String>,
        /// Reassign to another commercial (management only).
        #[arg(long)]
        commercial: Option<CollaboratorId>,
    },
}

// ── contracts ───────────────────────────────────────────────────────────────

#[derive(Subcommand, Debug, Clone)]
pub enum ContractCommand {
    Create {
        #[arg(long)]
        client: ClientId,
        #[arg(long)]
        total: f64,
        /// Defaults to the total amount.
        #[arg(long)]
        remaining: Option<f64>,
        #[arg(long)]
        signed: bool,
        /// Managing commercial. Defaults to the client's commercial.
        #[arg(long)]
        commercial: Option<CollaboratorId>,
    },
    List {
        /// Only contracts I manage.
        #[arg(long)]
        mine: bool,
        #[arg(long)]
        unsigned: bool,
        /// Only contracts with an outstanding balance.
        #[arg(long)]
        unpaid: bool,
    },
    Update {
        id: ContractId,
        #[arg(long)]
        total: Option<f64>,
        #[arg(long)]
        remaining: Option<f64>,
        #[arg(long)]
        signed: Option<bool>,
        #[arg(long)]
        commercial: Option<CollaboratorId>,
    },
    Delete {
        id: ContractId,
    },
}

// ── events ──────────────────────────────────────────────────────────────────

#[derive(Subcommand, Debug, Clone)]
pub enum EventCommand {
    Create {
        #[arg(long)]
        contract: ContractId,
        /// `YYYY-MM-DD HH:MM`
        #[arg(long, value_parser = parse_datetime)]
        start: NaiveDateTime,
        #[arg(long, value_parser = parse_datetime)]
        end: NaiveDateTime,
        #[arg(long)]
        location: String,
        #[arg(long, default_value_t = 0)]
        attendees: u32,
        #[arg(long)]
        expected_attendees: Option<u32>,
        #[arg(long)]
        notes: Option<String>,
    },
    List {
        /// Only events assigned to me.
        #[arg(long)]
        mine: bool,
        /// Only events with no support contact yet.
        #[arg(long)]
        unassigned: bool,
    },
    Update {
        id: EventId,
        #[arg(long, value_parser = parse_datetime)]
        start: Option<NaiveDateTime>,
        #[arg(long, value_parser = parse_datetime)]
        end: Option<NaiveDateTime>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        attendees: Option<u32>,
        #[arg(long)]
        expected_attendees: Option<u32>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Assign a support collaborator (management only).
    Assign {
        id: EventId,
        #[arg(long)]
        support: CollaboratorId,
    },
}

// ── roles ───────────────────────────────────────────────────────────────────

#[derive(Subcommand, Debug, Clone)]
pub enum RoleCommand {
    List,
    Show {
        name: String,
    },
    /// Why the current session may or may not perform an action.
    Explain {
        resource: Resource,
        action: Action,
    },
    /// Replace a stored role's permission payload.
    Set {
        name: String,
        /// e.g. `client.read event.update`
        permissions: Vec<Permission>,
    },
}

pub fn parse_datetime(raw: &str) -> Result<NaiveDateTime, String> {
    const FORMATS: [&str; 4] = ["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"];
    let raw = raw.trim();
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| format!("invalid date-time '{raw}' (expected YYYY-MM-DD HH:MM)"))
}
