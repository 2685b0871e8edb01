use chrono::Utc;

use epiccrm_auth::SessionContext;

use crate::App;
use crate::args::AuthCommand;
use crate::output;

pub fn run(app: &App, cmd: AuthCommand) -> anyhow::Result<String> {
    match cmd {
        AuthCommand::Login { email, password } => login(app, &email, &password),
        AuthCommand::Logout => logout(app),
        AuthCommand::Whoami => whoami(app),
    }
}

/// Verify credentials and replace any previous session.
fn login(app: &App, email: &str, password: &str) -> anyhow::Result<String> {
    let token = app.tokens().issue_token(app.store(), email, password)?;
    app.token_file().save(&token)?;

    let session = SessionContext::from_claims(app.tokens().validate_token(&token)?)?;
    let until = session
        .expires_at()
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_default();
    Ok(format!("Logged in as {}. Session valid until {until}.", session.principal()))
}

fn logout(app: &App) -> anyhow::Result<String> {
    if app.token_file().clear()? {
        Ok("Logged out.".to_string())
    } else {
        Ok("No active session.".to_string())
    }
}

fn whoami(app: &App) -> anyhow::Result<String> {
    let session = app.session()?;
    let principal = session.principal();
    let expires = session.expires_at();
    let remaining = expires
        .map(|t| format!("{} min", (t - Utc::now()).num_minutes().max(0)))
        .unwrap_or_default();

    Ok(output::fields(&[
        ("id", principal.id.to_string()),
        ("email", principal.email.clone()),
        ("role", principal.role.to_string()),
        (
            "expires",
            expires.map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string()).unwrap_or_default(),
        ),
        ("remaining", remaining),
    ]))
}
