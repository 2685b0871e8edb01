use anyhow::{Context, bail};

use epiccrm_auth::{Action, Operation, Resource};
use epiccrm_core::{ClientId, CollaboratorId, ContractId, ContractPatch, NewContract};
use epiccrm_infra::StoreError;

use crate::App;
use crate::args::ContractCommand;
use crate::output;

pub fn run(app: &App, cmd: ContractCommand) -> anyhow::Result<String> {
    match cmd {
        ContractCommand::Create {
            client,
            total,
            remaining,
            signed,
            commercial,
        } => create(app, client, total, remaining.unwrap_or(total), signed, commercial),
        ContractCommand::List {
            mine,
            unsigned,
            unpaid,
        } => list(app, mine, unsigned, unpaid),
        ContractCommand::Update {
            id,
            total,
            remaining,
            signed,
            commercial,
        } => update(
            app,
            id,
            ContractPatch {
                total_amount: total,
                remaining_amount: remaining,
                signed,
                contact_commercial_id: commercial,
            },
        ),
        ContractCommand::Delete { id } => delete(app, id),
    }
}

/// A commercial may only open contracts for the clients they follow, and
/// manages those contracts themselves.
fn create(
    app: &App,
    client_id: ClientId,
    total: f64,
    remaining: f64,
    signed: bool,
    commercial: Option<CollaboratorId>,
) -> anyhow::Result<String> {
    let session = app.authorized(Resource::Contract, Action::Create)?;
    let principal = session.principal();

    let client = app
        .store()
        .client(client_id)?
        .ok_or_else(|| StoreError::not_found("client", client_id))?;

    let owner = if principal.has_role(&app.guard().roles().sales) {
        app.guard().may_update_client(principal, Some(&client)).into_result()?;
        principal.id
    } else {
        commercial
            .or(client.contact_commercial_id)
            .context("client has no commercial: pass --commercial")?
    };

    let new = NewContract::new(client.id, owner, total, remaining, app.today(), signed)?;
    let created = app.store().create_contract(new)?;

    tracing::info!(by = %principal, id = %created.id, client = %client.id, "contract created");
    Ok(output::contracts(&[created]))
}

fn list(app: &App, mine: bool, unsigned: bool, unpaid: bool) -> anyhow::Result<String> {
    let session = app.authorized(Resource::Contract, Action::Read)?;
    let me = session.principal().id;

    let contracts: Vec<_> = app
        .store()
        .list_contracts()?
        .into_iter()
        .filter(|c| !mine || c.contact_commercial_id == me)
        .filter(|c| !unsigned || !c.signed)
        .filter(|c| !unpaid || c.remaining_amount > 0.0)
        .collect();
    Ok(output::contracts(&contracts))
}

fn update(app: &App, id: ContractId, patch: ContractPatch) -> anyhow::Result<String> {
    let session = app.authorized(Resource::Contract, Action::Update)?;
    let principal = session.principal();

    let contract = app.store().contract(id)?;
    app.guard()
        .may_update_contract(principal, contract.as_ref())
        .into_result()?;
    if contract.is_none() {
        return Err(StoreError::not_found("contract", id).into());
    }

    if patch.contact_commercial_id.is_some() {
        app.guard()
            .may_reassign_commercial(principal, Operation::ReassignContract)
            .into_result()?;
    }
    if patch.is_empty() {
        bail!("nothing to update: pass at least one field");
    }

    let updated = app.store().update_contract(id, &patch)?;
    tracing::info!(by = %principal, %id, "contract updated");
    Ok(output::contracts(&[updated]))
}

fn delete(app: &App, id: ContractId) -> anyhow::Result<String> {
    let session = app.authorized(Resource::Contract, Action::Delete)?;
    app.store().delete_contract(id)?;
    tracing::info!(by = %session.principal(), %id, "contract deleted");
    Ok(format!("Deleted contract #{id}."))
}
