//! Prints the at-the-money strike for a price.

use anyhow::{bail, Result};
use clap::Args;
use rust_decimal::Decimal;

use short_straddle_engine::atm_strike;

/// Arguments for the strike command.
#[derive(Args, Debug, Clone)]
pub struct StrikeArgs {
    /// Index last traded price
    #[arg(long)]
    pub ltp: Decimal,

    /// Distance between listed strikes
    #[arg(long, default_value = "50")]
    pub increment: Decimal,
}

/// Runs the strike command.
///
/// # Errors
/// Returns an error if the increment is not positive.
pub fn run_strike(args: &StrikeArgs) -> Result<Decimal> {
    if args.increment <= Decimal::ZERO {
        bail!("increment must be positive, got {}", args.increment);
    }
    let strike = atm_strike(args.ltp, args.increment);
    println!("{strike}");
    Ok(strike)
}
