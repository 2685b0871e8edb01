//! Command handlers.
//!
//! Every data command follows the same order: resolve the session, check the
//! role policy, check ownership where the operation has a row-level rule,
//! then touch the store. Handlers return the text to print.

pub mod auth;
pub mod clients;
pub mod collaborators;
pub mod contracts;
pub mod db;
pub mod events;
pub mod roles;

use crate::App;
use crate::args::Command;

pub fn execute(app: &App, command: Command) -> anyhow::Result<String> {
    match command {
        Command::Auth(cmd) => auth::run(app, cmd),
        Command::Db(cmd) => db::run(app, cmd),
        Command::Collaborator(cmd) => collaborators::run(app, cmd),
        Command::Client(cmd) => clients::run(app, cmd),
        Command::Contract(cmd) => contracts::run(app, cmd),
        Command::Event(cmd) => events::run(app, cmd),
        Command::Role(cmd) => roles::run(app, cmd),
    }
}
