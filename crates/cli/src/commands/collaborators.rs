use anyhow::bail;

use epiccrm_auth::{Action, Password, Resource};
use epiccrm_core::{CollaboratorId, CollaboratorPatch, Email, NewCollaborator};

use crate::App;
use crate::args::CollaboratorCommand;
use crate::output;

pub fn run(app: &App, cmd: CollaboratorCommand) -> anyhow::Result<String> {
    match cmd {
        CollaboratorCommand::Create {
            name,
            email,
            password,
            role,
        } => create(app, &name, &email, &password, &role),
        CollaboratorCommand::List => list(app),
        CollaboratorCommand::Update {
            id,
            name,
            email,
            password,
            role,
        } => update(app, id, name, email, password, role),
        CollaboratorCommand::Delete { id } => delete(app, id),
    }
}

fn create(app: &App, name: &str, email: &str, password: &str, role: &str) -> anyhow::Result<String> {
    let session = app.authorized(Resource::Collaborator, Action::Create)?;

    let hash = app.passwords().hash(&Password::new(password)?)?;
    let new = NewCollaborator::new(name, email, hash, role)?;
    let created = app.store().create_collaborator(new)?;

    tracing::info!(by = %session.principal(), id = %created.id, role = %created.role_name, "collaborator created");
    Ok(format!(
        "Created collaborator #{} ({}, {}).",
        created.id, created.email, created.role_name
    ))
}

fn list(app: &App) -> anyhow::Result<String> {
    app.authorized(Resource::Collaborator, Action::Read)?;
    Ok(output::collaborators(&app.store().list_collaborators()?))
}

fn update(
    app: &App,
    id: CollaboratorId,
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    role: Option<String>,
) -> anyhow::Result<String> {
    let session = app.authorized(Resource::Collaborator, Action::Update)?;

    let patch = CollaboratorPatch {
        name,
        email: email.as_deref().map(Email::parse).transpose()?,
        password_hash: match password {
            Some(raw) => Some(app.passwords().hash(&Password::new(&raw)?)?),
            None => None,
        },
        role_name: role,
    };
    if patch.is_empty() {
        bail!("nothing to update: pass at least one field");
    }

    let updated = app.store().update_collaborator(id, &patch)?;
    tracing::info!(by = %session.principal(), %id, "collaborator updated");
    Ok(output::collaborators(&[updated]))
}

fn delete(app: &App, id: CollaboratorId) -> anyhow::Result<String> {
    let session = app.authorized(Resource::Collaborator, Action::Delete)?;
    app.guard()
        .may_delete_collaborator(session.principal(), id)
        .into_result()?;

    app.store().delete_collaborator(id)?;
    tracing::info!(by = %session.principal(), %id, "collaborator deleted");
    Ok(format!("Deleted collaborator #{id}."))
}
