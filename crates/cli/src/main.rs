use clap::{Parser, Subcommand};

mod commands;

use commands::{RunArgs, StatusArgs, StrikeArgs};

#[derive(Parser)]
#[command(name = "short-straddle")]
#[command(about = "Intraday short straddle on the NIFTY index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run today's cycle: sell the straddle, protect it, close it out
    Run(RunArgs),
    /// Show the checkpointed legs for a trading day
    Status(StatusArgs),
    /// Print the ATM strike for an index price
    Strike(StrikeArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Run(args) => commands::run_cycle(args).await?,
        Commands::Status(args) => commands::run_status(args).await?,
        Commands::Strike(args) => {
            commands::run_strike(&args)?;
        }
    }

    Ok(())
}
