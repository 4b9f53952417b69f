mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use std::process::ExitCode;

fn main() -> Result<ExitCode, Box<dyn std::error::Error + Send + Sync>> {
    reportbox::observability::init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            if !commands::check(cli.config)? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Match(args) => commands::match_message(cli.config, &args.message)?,
    }

    Ok(ExitCode::SUCCESS)
}
