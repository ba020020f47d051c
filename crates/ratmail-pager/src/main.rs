use anyhow::Result;
use clap::Parser;

mod ansi;
mod cli;
mod config;
mod logging;
mod producer;
mod view;

use crate::cli::{Cli, output_error, run_cli};
use crate::config::load_pager_config;
use crate::logging::init_logging;

fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if err.use_stderr() => {
            return output_error(&err.to_string());
        }
        Err(err) => err.exit(),
    };
    init_logging();
    let config = load_pager_config();
    run_cli(cli.command, config)
}
