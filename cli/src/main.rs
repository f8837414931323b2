//! `quake-triage` entry point.

use clap::{Parser, Subcommand};
use quake_cli::config_cmd::{self, ConfigArgs};
use quake_cli::run_cmd::{self, RunArgs};
use tracing_subscriber::EnvFilter;

/// Post-earthquake account risk triage
#[derive(Debug, Parser)]
#[command(name = "quake-triage", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Triage accounts against an earthquake and print the assessments
    Run(RunArgs),

    /// Print the effective configuration
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match cli.command {
        Command::Run(args) => run_cmd::run(args).await,
        Command::Config(args) => config_cmd::run(args),
    };
    std::process::exit(code);
}
