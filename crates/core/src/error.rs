//! Error taxonomy for the strategy.
//!
//! Every failing step surfaces one of these unchanged to the engine, which
//! aborts the run. Only brokerage failures are worth retrying.

use thiserror::Error;

/// Errors that can abort a strategy run.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// Network or brokerage failure.
    #[error("broker error: {0}")]
    TransientBroker(String),

    /// Symbol, expiry or lot-size lookup failed.
    #[error("resolution error: {0}")]
    Resolution(String),

    /// Checkpoint read or write failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A time window closed before the run reached it.
    #[error("window missed: {0}")]
    WindowMissed(String),

    /// The stop token fired while waiting.
    #[error("run cancelled")]
    Cancelled,
}

impl StrategyError {
    /// Creates a brokerage error.
    pub fn broker(message: impl Into<String>) -> Self {
        Self::TransientBroker(message.into())
    }

    /// Creates a resolution error.
    pub fn resolution(message: impl Into<String>) -> Self {
        Self::Resolution(message.into())
    }

    /// Creates a persistence error.
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Returns true if the failed call may succeed when repeated.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientBroker(_))
    }
}

impl From<serde_json::Error> for StrategyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Persistence(format!("document shape: {err}"))
    }
}

/// Result type alias for strategy operations.
pub type Result<T> = std::result::Result<T, StrategyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_broker_errors_are_retryable() {
        assert!(StrategyError::broker("connection reset").is_retryable());
        assert!(!StrategyError::resolution("no such strike").is_retryable());
        assert!(!StrategyError::persistence("disk full").is_retryable());
        assert!(!StrategyError::config("lot multiplier unset").is_retryable());
        assert!(!StrategyError::WindowMissed("entry".into()).is_retryable());
        assert!(!StrategyError::Cancelled.is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = StrategyError::broker("gateway timeout");
        assert!(err.to_string().contains("broker"));
        assert!(err.to_string().contains("gateway timeout"));

        let err = StrategyError::config("missing lot multiplier");
        assert!(err.to_string().contains("configuration"));
    }

    #[test]
    fn test_json_errors_become_persistence_errors() {
        let err: StrategyError = serde_json::from_str::<u32>("\"nope\"").unwrap_err().into();
        assert!(matches!(err, StrategyError::Persistence(_)));
    }
}
