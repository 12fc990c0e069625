//! Execution engine for the intraday short straddle.
//!
//! Waits for the entry window, sells an at-the-money call and put, protects
//! both with stop-loss buys, and at the exit window cancels the stops and
//! buys back whatever is still open. Progress is checkpointed per trading
//! day so a restarted process picks up at the first leg it has not placed.

pub mod clock;
pub mod engine;
pub mod executor;
pub mod legs;
pub mod retry;
pub mod snapshot;
pub mod time_gate;

pub use clock::{Clock, ManualClock, StopToken, SystemClock};
pub use engine::{CycleReport, EnginePhase, StrategyEngine};
pub use executor::OrderExecutor;
pub use legs::{atm_strike, stop_loss_percentage, stop_loss_prices, LegCalculator};
pub use retry::{retry, RetryPolicy};
pub use snapshot::{SnapshotHandle, SnapshotRepository, StrategySnapshot, SNAPSHOT_SCHEMA_VERSION};
pub use time_gate::{TimeGate, TimeWindow};
