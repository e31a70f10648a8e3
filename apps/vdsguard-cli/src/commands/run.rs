//! Run a reconciliation pass

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use tracing::info;

use vdsguard_client::{DremioClient, SqlTransport};
use vdsguard_engine::{Applier, EngineOptions, ReconcileEngine, RuleLoader, RunContext};

use crate::config::Settings;
use crate::error::{CliError, CliResult};

#[derive(Args)]
pub struct RunArgs {
    /// Path to the configuration file
    #[arg(long, short = 'c')]
    pub config: PathBuf,

    /// CSV rule source, used when the config sets no rules_vds
    #[arg(long)]
    pub rules_csv: Option<PathBuf>,
}

pub async fn execute(args: RunArgs) -> CliResult<()> {
    let settings = Settings::load(&args.config)?;

    let client = DremioClient::connect(settings.client_config())
        .await
        .map_err(CliError::Connection)?;
    let transport = Arc::new(client);
    let applier = Applier::new(transport.clone());

    let mode = settings.access_mode();
    let context =
        RunContext::initialize(&applier, mode, settings.include_group_grantees).await?;

    let loader = RuleLoader::new(settings.column_map());
    let rule_sets = match (&settings.rules_vds, &args.rules_csv) {
        (Some(rules_vds), _) => loader.load_from_query(&applier, rules_vds).await?,
        (None, Some(path)) => loader.load_from_csv(path)?,
        (None, None) => {
            return Err(CliError::Validation(
                "no rule source: set rules_vds in the config or pass --rules-csv".to_string(),
            ));
        }
    };
    info!(datasets = rule_sets.len(), "rule table loaded");

    let engine = ReconcileEngine::new(
        applier,
        context,
        EngineOptions {
            mode,
            grants: settings.grant_options(),
            operating_user: settings.username.clone(),
        },
    );
    let summary = engine.run(&rule_sets).await;

    // Session teardown failures are not worth failing a finished run over.
    let _ = transport.disconnect().await;

    println!("run {} ({} mode)", summary.run_id, mode);
    println!("  datasets:  {}", summary.datasets_total);
    println!("  applied:   {}", summary.applied);
    println!("  unchanged: {}", summary.unchanged);
    println!("  skipped:   {}", summary.skipped);
    println!("  failed:    {}", summary.failed);

    if summary.is_clean() {
        Ok(())
    } else {
        Err(CliError::ReconciliationFailed {
            failed: summary.failed,
        })
    }
}
