use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "reportbox")]
#[command(about = "Abuse report classification", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $REPORTBOX_CONFIG or config/reportbox.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Report structural problems in the parser configuration
    Check,
    /// Show which configured parser a raw message would be dispatched to
    Match(MatchArgs),
}

#[derive(clap::Args, Debug)]
pub struct MatchArgs {
    /// Raw RFC 5322 message
    pub message: PathBuf,
}
