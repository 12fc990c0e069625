//! CLI commands for the short straddle.

pub mod run;
pub mod status;
pub mod strike;

pub use run::{run_cycle, RunArgs};
pub use status::{run_status, StatusArgs};
pub use strike::{run_strike, StrikeArgs};
