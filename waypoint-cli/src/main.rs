//! Waypoint CLI - Command-line interface
//!
//! Process entry point: constructs and registers the concrete place-search
//! providers, initializes the factory from the environment, and exposes
//! search and health commands.

mod bootstrap;
mod commands;
mod tracing_setup;

use clap::Parser;

#[derive(Parser)]
#[command(name = "waypoint")]
#[command(about = "Place search with pluggable providers and failover")]
struct Cli {
    /// Console log level
    #[arg(long, value_enum, default_value_t = tracing_setup::CliLogLevel::Warn)]
    log_level: tracing_setup::CliLogLevel,

    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_setup::init_tracing(cli.log_level.as_tracing_level())?;

    commands::handle_command(cli.command).await
}
