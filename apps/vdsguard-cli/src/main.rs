//! vdsguard CLI - Reconcile declarative access rules against a remote
//! tabular-data service
//!
//! - `vdsguard run` applies the configured rule table, issuing only the
//!   grant/policy statements needed to converge the service
//! - `vdsguard check` validates configuration and connectivity

use clap::{Parser, Subcommand};

mod commands;
mod config;
mod error;

use error::CliResult;

/// vdsguard - dataset access-rule reconciliation
#[derive(Parser)]
#[command(name = "vdsguard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the rule table against the service
    Run(commands::run::RunArgs),

    /// Validate configuration and connectivity
    Check(commands::check::CheckArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Run(args) => commands::run::execute(args).await,
        Commands::Check(args) => commands::check::execute(args).await,
    }
}
