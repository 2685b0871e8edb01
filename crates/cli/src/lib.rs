//! Command-line front end: argument parsing, wiring, and output rendering.

pub mod args;
pub mod commands;
pub mod config;
pub mod context;
pub mod exit;
pub mod output;

pub use commands::execute;
pub use config::CrmConfig;
pub use context::App;
