//! Diagnose configuration and connectivity

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;

use vdsguard_client::{DremioClient, SqlTransport};
use vdsguard_engine::{Applier, RunContext};

use crate::config::Settings;
use crate::error::{CliError, CliResult};

#[derive(Args)]
pub struct CheckArgs {
    /// Path to the configuration file
    #[arg(long, short = 'c')]
    pub config: PathBuf,
}

pub async fn execute(args: CheckArgs) -> CliResult<()> {
    let settings = Settings::load(&args.config)?;
    println!("config:     ok ({} mode)", settings.access_mode());

    let client = DremioClient::connect(settings.client_config())
        .await
        .map_err(CliError::Connection)?;
    println!("connection: ok ({})", settings.host);

    let transport = Arc::new(client);
    let applier = Applier::new(transport.clone());
    let context = RunContext::initialize(
        &applier,
        settings.access_mode(),
        settings.include_group_grantees,
    )
    .await?;
    println!("catalog:    {} addressable paths", context.catalog().len());

    if settings.rules_vds.is_none() {
        println!("rules:      no rules_vds configured; runs will need --rules-csv");
    }

    let _ = transport.disconnect().await;
    Ok(())
}
