use chrono::{NaiveTime, Weekday};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StrategyError};
use crate::traits::ExpiryBucket;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub strategy: StrategyConfig,
    pub database: DatabaseConfig,
    pub paper: PaperConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Also the name of the checkpoint collection.
    pub name: String,
    /// IANA zone the windows are expressed in.
    pub timezone: String,
    /// Quote symbol of the index the strike is derived from.
    pub index_symbol: String,
    /// Option underlying name used for symbol resolution.
    pub underlying: String,
    pub exchange: String,
    pub strike_increment: Decimal,
    /// Lots per leg. Kept raw so a bad value only fails when a leg is sized.
    pub lot_multiplier: Option<RawSetting>,
    pub expiry_bucket: ExpiryBucket,
    pub week_offset: u32,
    pub entry_window: WindowConfig,
    pub exit_window: WindowConfig,
    pub poll_interval_secs: u64,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay_secs: u64,
}

/// A scalar as it came out of the config sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawSetting {
    Number(i64),
    Text(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `sqlite://...` for a file-backed store, `memory` for a throwaway one.
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperConfig {
    /// Quote returned for every index lookup.
    pub index_ltp: Decimal,
    /// Fill price for market orders.
    pub premium: Decimal,
    pub lot_size: u32,
    pub expiry_weekday: Weekday,
    pub expiry_time: NaiveTime,
    /// Report stop-loss orders as already triggered.
    pub stops_trigger: bool,
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            name: "twelve_thirty".to_string(),
            timezone: "Asia/Kolkata".to_string(),
            index_symbol: "NIFTY 50".to_string(),
            underlying: "NIFTY".to_string(),
            exchange: "NFO".to_string(),
            strike_increment: Decimal::from(50),
            lot_multiplier: None,
            expiry_bucket: ExpiryBucket::Weekly,
            week_offset: 0,
            entry_window: WindowConfig {
                start: hm(12, 25),
                end: hm(12, 35),
            },
            exit_window: WindowConfig {
                start: hm(15, 25),
                end: hm(15, 30),
            },
            poll_interval_secs: 60,
            retry: RetryConfig {
                max_attempts: 5,
                delay_secs: 5,
            },
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/short_straddle.db".to_string(),
        }
    }
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            index_ltp: Decimal::from(24_860),
            premium: Decimal::from(100),
            lot_size: 75,
            expiry_weekday: Weekday::Tue,
            expiry_time: hm(15, 30),
            stops_trigger: false,
        }
    }
}

impl StrategyConfig {
    /// Parses the configured timezone.
    ///
    /// # Errors
    ///
    /// Returns `StrategyError::Config` for an unknown zone name.
    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| StrategyError::config(format!("timezone {:?}: {e}", self.timezone)))
    }

    /// Parses the lot multiplier.
    ///
    /// # Errors
    ///
    /// Returns `StrategyError::Config` when the multiplier is unset, not a
    /// number, or not positive.
    pub fn lot_multiplier(&self) -> Result<u32> {
        let parsed = match &self.lot_multiplier {
            None => return Err(StrategyError::config("lot multiplier is not set")),
            Some(RawSetting::Number(n)) => u32::try_from(*n).ok(),
            Some(RawSetting::Text(s)) => s.trim().parse::<u32>().ok(),
        };
        match parsed {
            Some(n) if n > 0 => Ok(n),
            _ => Err(StrategyError::config(format!(
                "lot multiplier {:?} is not a positive integer",
                self.lot_multiplier
            ))),
        }
    }
}
