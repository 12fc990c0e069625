//! Option legs as the brokerage sees them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Option contract right, in NSE notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionType {
    #[serde(rename = "CE")]
    Call,
    #[serde(rename = "PE")]
    Put,
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "CE"),
            Self::Put => write!(f, "PE"),
        }
    }
}

/// Order side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Buy,
    #[default]
    Sell,
}

impl TransactionType {
    /// The offsetting side.
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Order type. `StopLoss` is a stop-trigger order carrying both a trigger
/// and a limit price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    #[default]
    #[serde(rename = "MARKET")]
    Market,
    #[serde(rename = "LIMIT")]
    Limit,
    #[serde(rename = "SL")]
    StopLoss,
}

/// Margin product. `Nrml` is carry-forward, `Mis` is intraday.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProductType {
    #[default]
    Nrml,
    Mis,
}

/// Order status strings as reported by the brokerage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "OPEN")]
    Open,
    #[serde(rename = "TRIGGER PENDING")]
    TriggerPending,
    #[serde(rename = "COMPLETE")]
    Complete,
    #[serde(rename = "CANCELLED")]
    Cancelled,
    #[serde(rename = "REJECTED")]
    Rejected,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::TriggerPending => write!(f, "TRIGGER PENDING"),
            Self::Complete => write!(f, "COMPLETE"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// A tradable leg.
///
/// The default value is the empty slot: no trading symbol, nothing submitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub trading_symbol: String,
    pub exchange: String,
    pub product: ProductType,
    pub transaction_type: TransactionType,
    pub order_type: OrderType,
    pub quantity: u32,
    pub lot_size: u32,
    pub strike: Decimal,
    pub average_price: Decimal,
    pub trigger_price: Decimal,
    /// Limit price (only meaningful for limit and stop-loss orders).
    pub price: Decimal,
    pub expiry: Option<DateTime<Utc>>,
    pub option_type: Option<OptionType>,
    pub order_id: Option<String>,
    pub status: Option<OrderStatus>,
}

impl Position {
    /// True once the leg has been placed in the current trading day.
    #[must_use]
    pub fn is_placed(&self) -> bool {
        !self.trading_symbol.is_empty()
    }

    /// True when the brokerage reported the order as fully executed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == Some(OrderStatus::Complete)
    }

    /// True once the brokerage can no longer act on the order.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            Some(OrderStatus::Complete | OrderStatus::Cancelled | OrderStatus::Rejected)
        )
    }

    /// Forget the brokerage-side identity so the leg can be submitted again.
    pub fn clear_order(&mut self) {
        self.order_id = None;
        self.status = None;
    }
}
