//! Runs one daily cycle against the paper broker.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use short_straddle_core::config_loader::DEFAULT_CONFIG_PATH;
use short_straddle_core::{ConfigLoader, StrategyError};
use short_straddle_data::open_store;
use short_straddle_engine::{StopToken, StrategyEngine, SystemClock};
use short_straddle_paper::PaperBroker;

/// Arguments for the run command.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,
}

/// Runs the run command.
///
/// # Errors
/// Returns an error if configuration is invalid, the store cannot be opened,
/// or the cycle aborts. A Ctrl+C during a wait ends the run without error.
pub async fn run_cycle(args: RunArgs) -> Result<()> {
    let config = ConfigLoader::load_from(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config))?;
    let timezone = config.strategy.timezone()?;

    let store = open_store(&config.database.url)
        .await
        .with_context(|| format!("failed to open store {}", config.database.url))?;
    let broker = Arc::new(PaperBroker::new(config.paper.clone(), timezone));

    let stop = StopToken::new();
    let stop_on_ctrl_c = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, stopping...");
            stop_on_ctrl_c.cancel();
        }
    });

    info!(
        strategy = %config.strategy.name,
        timezone = %timezone,
        store = %config.database.url,
        "Starting daily cycle"
    );
    let mut engine = StrategyEngine::new(
        config.strategy,
        broker.clone(),
        broker,
        store,
        Arc::new(SystemClock),
        stop,
    )?;

    match engine.run().await {
        Ok(report) => {
            info!(
                day = %report.trading_day,
                flattened = report.flattened.len(),
                already_completed = report.already_completed,
                "Daily cycle finished"
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Err(StrategyError::Cancelled) => {
            warn!(phase = %engine.phase(), "Run cancelled, progress so far is checkpointed");
            Ok(())
        }
        Err(e) => Err(e).with_context(|| format!("cycle aborted in phase {}", engine.phase())),
    }
}
