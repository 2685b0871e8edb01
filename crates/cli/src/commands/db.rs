use epiccrm_auth::{Action, Resource};
use epiccrm_infra::initialize;

use crate::App;
use crate::args::DbCommand;
use crate::output;

pub fn run(app: &App, cmd: DbCommand) -> anyhow::Result<String> {
    match cmd {
        DbCommand::Init => init(app),
        DbCommand::Read { table } => read(app, table),
    }
}

fn init(app: &App) -> anyhow::Result<String> {
    let created = initialize(app.store(), app.policy())?;
    if created.is_empty() {
        Ok("Schema ready. Roles already present.".to_string())
    } else {
        Ok(format!("Schema ready. Seeded roles: {}.", created.join(", ")))
    }
}

fn read(app: &App, table: Resource) -> anyhow::Result<String> {
    let session = app.authorized(table, Action::Read)?;
    tracing::debug!(principal = %session.principal(), %table, "reading table");

    let store = app.store();
    Ok(match table {
        Resource::Collaborator => output::collaborators(&store.list_collaborators()?),
        Resource::Client => output::clients(&store.list_clients()?),
        Resource::Contract => output::contracts(&store.list_contracts()?),
        Resource::Event => output::events(&store.list_events()?),
        Resource::Role => output::roles(&store.list_roles()?),
    })
}
