use anyhow::bail;

use epiccrm_auth::{Action, Operation, Resource};
use epiccrm_core::{ClientId, ClientPatch, CollaboratorId, Email, NewClient};
use epiccrm_infra::StoreError;

use crate::App;
use crate::args::ClientCommand;
use crate::output;

pub fn run(app: &App, cmd: ClientCommand) -> anyhow::Result<String> {
    match cmd {
        ClientCommand::Create {
            full_name,
            email,
            phone,
            company,
            commercial,
        } => create(app, &full_name, &email, &phone, &company, commercial),
        ClientCommand::List { mine } => list(app, mine),
        ClientCommand::Update {
            id,
            full_name,
            email,
            phone,
            company,
            commercial,
        } => update(
            app,
            id,
            ClientUpdate {
                full_name,
                email,
                phone,
                company,
                commercial,
            },
        ),
    }
}

/// A commercial always becomes the owner of the clients they create.
fn create(
    app: &App,
    full_name: &str,
    email: &str,
    phone: &str,
    company: &str,
    commercial: Option<CollaboratorId>,
) -> anyhow::Result<String> {
    let session = app.authorized(Resource::Client, Action::Create)?;
    let principal = session.principal();

    let owner = if principal.has_role(&app.guard().roles().sales) {
        Some(principal.id)
    } else {
        commercial
    };

    let new = NewClient::new(full_name, email, phone, company, app.today(), owner)?;
    let created = app.store().create_client(new)?;

    tracing::info!(by = %principal, id = %created.id, "client created");
    Ok(match created.contact_commercial_id {
        Some(owner) => format!("Created client #{} followed by commercial #{owner}.", created.id),
        None => format!("Created client #{} with no commercial yet.", created.id),
    })
}

fn list(app: &App, mine: bool) -> anyhow::Result<String> {
    let session = app.authorized(Resource::Client, Action::Read)?;
    let me = session.principal().id;

    let clients: Vec<_> = app
        .store()
        .list_clients()?
        .into_iter()
        .filter(|c| !mine || c.contact_commercial_id == Some(me))
        .collect();
    Ok(output::clients(&clients))
}

struct ClientUpdate {
    full_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    company: Option<String>,
    commercial: Option<CollaboratorId>,
}

fn update(app: &App, id: ClientId, fields: ClientUpdate) -> anyhow::Result<String> {
    let session = app.authorized(Resource::Client, Action::Update)?;
    let principal = session.principal();

    let patch = ClientPatch {
        full_name: fields.full_name,
        email: fields.email.as_deref().map(Email::parse).transpose()?,
        phone: fields.phone,
        company: fields.company,
        contact_commercial_id: fields.commercial,
    };

    let client = app.store().client(id)?;
    app.guard()
        .may_update_client(principal, client.as_ref())
        .into_result()?;
    if client.is_none() {
        return Err(StoreError::not_found("client", id).into());
    }

    if patch.contact_commercial_id.is_some() {
        app.guard()
            .may_reassign_commercial(principal, Operation::ReassignClient)
            .into_result()?;
    }
    if patch.is_empty() {
        bail!("nothing to update: pass at least one field");
    }

    let updated = app.store().update_client(id, &patch, app.today())?;
    tracing::info!(by = %principal, %id, "client updated");
    Ok(output::clients(&[updated]))
}
