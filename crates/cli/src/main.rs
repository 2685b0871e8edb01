use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use epiccrm_auth::{PolicySource, TokenFile, TokenService};
use epiccrm_cli::args::{Cli, Command, DbCommand};
use epiccrm_cli::{App, CrmConfig, execute, exit};
use epiccrm_infra::{PostgresStore, load_policy};

fn main() -> ExitCode {
    let cli = Cli::parse();
    epiccrm_observability::init(cli.global.log_format);

    match run(cli) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{output}");
            }
            ExitCode::from(exit::SUCCESS)
        }
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            eprintln!("Error: {err:#}");
            ExitCode::from(exit::code_for(&err))
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<String> {
    let config = CrmConfig::from_args(&cli.global)?;
    let store = PostgresStore::connect(&config.database).context("connecting to the database")?;

    // Role rows may not exist yet while the schema is being created.
    let source = match cli.command {
        Command::Db(DbCommand::Init) => PolicySource::Builtin,
        _ => config.policy_source,
    };
    let policy = load_policy(&store, source).context("loading the permission policy")?;
    tracing::debug!(?source, roles = policy.roles().len(), "policy loaded");

    let tokens = TokenService::new(config.secret_key.as_bytes())?.with_ttl(config.token_ttl);
    let app = App::new(Box::new(store), tokens, TokenFile::new(config.token_file)).with_policy(policy);

    execute(&app, cli.command)
}
