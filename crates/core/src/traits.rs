use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::position::{OptionType, Position};

/// Order placement and quotes.
#[async_trait]
pub trait Broker: Send + Sync {
    async fn last_traded_price(&self, symbol: &str) -> Result<Decimal>;

    /// Submits the leg. On success the leg carries the fill price, order id
    /// and status reported by the brokerage.
    async fn place_order(&self, position: &mut Position) -> Result<()>;

    /// Cancels a pending order. On success the leg's status reflects the
    /// order's final state: `Cancelled` when it was withdrawn, `Complete`
    /// when it had already triggered.
    async fn cancel_order(&self, position: &mut Position) -> Result<()>;
}

/// Which expiry series to trade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpiryBucket {
    #[default]
    Weekly,
    Monthly,
}

/// Instrument lookup.
#[async_trait]
pub trait SymbolResolver: Send + Sync {
    async fn resolve_symbol(
        &self,
        underlying: &str,
        bucket: ExpiryBucket,
        week_offset: u32,
        strike: Decimal,
        option_type: OptionType,
    ) -> Result<String>;

    async fn resolve_expiry(
        &self,
        underlying: &str,
        bucket: ExpiryBucket,
        week_offset: u32,
        strike: Decimal,
        option_type: OptionType,
    ) -> Result<DateTime<Utc>>;

    async fn resolve_lot_size(&self, symbol: &str) -> Result<u32>;

    /// Last traded price of the index the strike is derived from.
    async fn resolve_atm_input(&self, index_symbol: &str) -> Result<Decimal>;
}

/// Storage identifier of a persisted document.
pub type DocumentId = i64;

/// Locates a single document in a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentFilter {
    ById(DocumentId),
    ByKey(String),
}

/// A raw persisted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub key: String,
    pub body: serde_json::Value,
}

/// Minimal document store used for checkpoints.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn ensure_collection(&self, name: &str) -> Result<()>;

    async fn read(&self, filter: &DocumentFilter, name: &str) -> Result<Option<Document>>;

    async fn insert(&self, key: &str, body: &serde_json::Value, name: &str) -> Result<DocumentId>;

    /// Replaces the body of the matching document. Fails if nothing matches.
    async fn update(&self, filter: &DocumentFilter, body: &serde_json::Value, name: &str)
        -> Result<()>;
}
