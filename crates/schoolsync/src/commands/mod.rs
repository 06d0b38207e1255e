//! Command dispatch: bridges CLI args -> core types -> output formatting.

pub mod cache;
pub mod config_cmd;
pub mod fees;
pub mod util;

use crate::cli::{Command, GlobalOpts};
use crate::config::Config;
use crate::error::CliError;

/// Dispatch a command that needs the loaded config to its handler.
pub async fn dispatch(cmd: Command, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Cache(args) => cache::handle(args, cfg, global).await,
        Command::Fees(args) => fees::handle(args, cfg, global),
        Command::Config(args) => config_cmd::handle(args, global),
    }
}
