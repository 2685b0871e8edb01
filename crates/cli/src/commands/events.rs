use anyhow::{Context, bail};
use chrono::NaiveDateTime;

use epiccrm_auth::{Action, Resource, Role};
use epiccrm_core::{CollaboratorId, ContractId, EventId, EventPatch, NewEvent};
use epiccrm_infra::StoreError;

use crate::App;
use crate::args::EventCommand;
use crate::output;

pub fn run(app: &App, cmd: EventCommand) -> anyhow::Result<String> {
    match cmd {
        EventCommand::Create {
            contract,
            start,
            end,
            location,
            attendees,
            expected_attendees,
            notes,
        } => create(
            app,
            contract,
            (start, end),
            &location,
            attendees,
            expected_attendees,
            notes,
        ),
        EventCommand::List { mine, unassigned } => list(app, mine, unassigned),
        EventCommand::Update {
            id,
            start,
            end,
            location,
            attendees,
            expected_attendees,
            notes,
        } => update(
            app,
            id,
            EventPatch {
                support_contact_id: None,
                starts_at: start,
                ends_at: end,
                location,
                attendees,
                expected_attendees,
                notes,
            },
        ),
        EventCommand::Assign { id, support } => assign(app, id, support),
    }
}

/// Events start without a support contact; management assigns one later.
fn create(
    app: &App,
    contract_id: ContractId,
    (start, end): (NaiveDateTime, NaiveDateTime),
    location: &str,
    attendees: u32,
    expected_attendees: Option<u32>,
    notes: Option<String>,
) -> anyhow::Result<String> {
    let session = app.authorized(Resource::Event, Action::Create)?;
    let principal = session.principal();

    let contract = app.store().contract(contract_id)?;
    app.guard()
        .may_create_event(principal, contract.as_ref())
        .into_result()?;
    let contract = contract.context("contract not found")?;

    let new = NewEvent::new(
        contract.id,
        contract.client_id,
        None,
        start,
        end,
        location,
        attendees,
        expected_attendees,
        notes,
    )?;
    let created = app.store().create_event(new)?;

    tracing::info!(by = %principal, id = %created.id, contract = %contract.id, "event created");
    Ok(output::events(&[created]))
}

fn list(app: &App, mine: bool, unassigned: bool) -> anyhow::Result<String> {
    let session = app.authorized(Resource::Event, Action::Read)?;
    let me = session.principal().id;

    let events: Vec<_> = app
        .store()
        .list_events()?
        .into_iter()
        .filter(|e| !mine || e.support_contact_id == Some(me))
        .filter(|e| !unassigned || e.support_contact_id.is_none())
        .collect();
    Ok(output::events(&events))
}

fn update(app: &App, id: EventId, patch: EventPatch) -> anyhow::Result<String> {
    let session = app.authorized(Resource::Event, Action::Update)?;
    let principal = session.principal();

    let event = app.store().event(id)?;
    app.guard().may_update_event(principal, event.as_ref()).into_result()?;

    if patch.is_empty() {
        bail!("nothing to update: pass at least one field");
    }

    let updated = app.store().update_event(id, &patch)?;
    tracing::info!(by = %principal, %id, "event updated");
    Ok(output::events(&[updated]))
}

fn assign(app: &App, id: EventId, support: CollaboratorId) -> anyhow::Result<String> {
    let session = app.authorized(Resource::Event, Action::Update)?;
    let principal = session.principal();

    let event = app.store().event(id)?;
    app.guard()
        .may_assign_event_support(principal, event.as_ref())
        .into_result()?;

    let collaborator = app
        .store()
        .collaborator(support)?
        .ok_or_else(|| StoreError::not_found("collaborator", support))?;
    if Role::from(collaborator.role_name.as_str()) != app.guard().roles().support {
        bail!(
            "collaborator #{support} has role '{}', only {} staff can run events",
            collaborator.role_name,
            app.guard().roles().support
        );
    }

    let patch = EventPatch {
        support_contact_id: Some(support),
        ..EventPatch::default()
    };
    let updated = app.store().update_event(id, &patch)?;

    tracing::info!(by = %principal, %id, %support, "event support assigned");
    Ok(output::events(&[updated]))
}
