use anyhow::bail;

use epiccrm_auth::{Action, Permission, PermissionPolicy, Resource, Role, explain_authorization};

use crate::App;
use crate::args::RoleCommand;
use crate::output;

pub fn run(app: &App, cmd: RoleCommand) -> anyhow::Result<String> {
    match cmd {
        RoleCommand::List => list(app),
        RoleCommand::Show { name } => show(app, &name),
        RoleCommand::Explain { resource, action } => explain(app, resource, action),
        RoleCommand::Set { name, permissions } => set(app, &name, &permissions),
    }
}

fn joined(permissions: &[Permission]) -> String {
    permissions.iter().map(Permission::to_string).collect::<Vec<_>>().join(", ")
}

/// The policy in force for this process, which may differ from the stored
/// role rows when the compiled-in table is used.
fn list(app: &App) -> anyhow::Result<String> {
    app.authorized(Resource::Role, Action::Read)?;

    let catalog = app.guard().roles();
    let pairs: Vec<(&str, String)> = app
        .policy()
        .roles()
        .into_iter()
        .map(|role| {
            let description = catalog.description(role).unwrap_or("custom role");
            (
                role.as_str(),
                format!("{description}\n{}", joined(&app.policy().permissions_for(role))),
            )
        })
        .collect();
    Ok(output::fields(&pairs))
}

fn show(app: &App, name: &str) -> anyhow::Result<String> {
    app.authorized(Resource::Role, Action::Read)?;

    let role = Role::from(name);
    let stored = app.store().role_by_name(name)?;
    if !app.policy().knows_role(&role) && stored.is_none() {
        bail!("unknown role '{name}'");
    }

    let mut pairs = vec![
        ("role", role.to_string()),
        (
            "description",
            app.guard().roles().description(&role).unwrap_or("custom role").to_string(),
        ),
        ("effective permissions", joined(&app.policy().permissions_for(&role))),
    ];
    if let Some(record) = stored {
        let payload = record
            .permissions
            .iter()
            .map(|(resource, actions)| format!("{resource}: {}", actions.join(", ")))
            .collect::<Vec<_>>()
            .join("\n");
        pairs.push(("stored record", format!("#{}", record.id)));
        pairs.push(("stored permissions", payload));
    }
    Ok(output::fields(&pairs))
}

/// Needs only a valid session: anyone may ask why they are (not) allowed.
fn explain(app: &App, resource: Resource, action: Action) -> anyhow::Result<String> {
    let session = app.session()?;
    let explanation = explain_authorization(app.policy(), session.principal(), resource, action);
    Ok(output::explanation(&explanation))
}

fn set(app: &App, name: &str, permissions: &[Permission]) -> anyhow::Result<String> {
    let session = app.authorized(Resource::Role, Action::Update)?;

    let role = Role::from(name);
    let policy = permissions.iter().fold(PermissionPolicy::empty(), |policy, p| {
        policy.grant(role.clone(), p.resource, &[p.action])
    });
    let updated = app
        .store()
        .set_role_permissions(name, &policy.to_permission_map(&role))?;

    tracing::info!(by = %session.principal(), role = %name, "role permissions replaced");
    Ok(format!(
        "{}\nStored permissions take effect with CRM_POLICY_SOURCE=store.",
        output::roles(&[updated])
    ))
}
