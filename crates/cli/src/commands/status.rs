//! Shows the stored snapshot for a trading day.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Args;

use short_straddle_core::config_loader::DEFAULT_CONFIG_PATH;
use short_straddle_core::ConfigLoader;
use short_straddle_data::open_store;
use short_straddle_engine::SnapshotRepository;

/// Arguments for the status command.
#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Trading day (YYYY-MM-DD). Defaults to today in the strategy timezone.
    #[arg(long)]
    pub day: Option<NaiveDate>,
}

/// Runs the status command.
///
/// # Errors
/// Returns an error if configuration is invalid or the store cannot be read.
pub async fn run_status(args: StatusArgs) -> Result<()> {
    let config = ConfigLoader::load_from(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config))?;
    let timezone = config.strategy.timezone()?;
    let day = args
        .day
        .unwrap_or_else(|| Utc::now().with_timezone(&timezone).date_naive());

    let store = open_store(&config.database.url)
        .await
        .with_context(|| format!("failed to open store {}", config.database.url))?;
    let repo = SnapshotRepository::new(store, config.strategy.name.clone());

    match repo.find(day).await? {
        Some(snapshot) => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        None => println!("no snapshot for {day} in {}", repo.collection()),
    }
    Ok(())
}
