//! Paper brokerage for the intraday short straddle.
//!
//! Implements the `Broker` and `SymbolResolver` contracts without touching a
//! real exchange: market orders fill at a configured premium, stop-loss
//! orders rest until cancelled, and NSE option symbols and expiries are
//! derived locally. Live adapters implement the same two traits.

pub mod client;
pub mod execution;
pub mod options_chain;
pub mod paper;
pub mod types;

pub use client::PaperBroker;
pub use types::OptionContract;
