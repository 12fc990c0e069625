//! Strike selection, leg construction and stop-loss pricing.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};

use short_straddle_core::{
    OptionType, OrderType, Position, ProductType, Result, StrategyConfig, StrategyError, SymbolResolver,
    TransactionType,
};

use crate::clock::Clock;

/// Stop-loss percentage once the contract has expired.
pub const EXPIRED_STOP_PCT: u32 = 70;
/// Stop-loss percentage inside the last 24 hours before expiry.
pub const EXPIRY_DAY_STOP_PCT: u32 = 40;
/// Stop-loss percentage for everything further out.
pub const DEFAULT_STOP_PCT: u32 = 30;
/// Added to the floored trigger to form the stop's limit price.
pub const STOP_LIMIT_BUFFER: i64 = 5;

/// Rounds an index price to the nearest strike, ties going down.
///
/// A remainder above half the increment rounds up to the next strike,
/// anything else rounds down. The result is always a whole number.
#[must_use]
pub fn atm_strike(ltp: Decimal, increment: Decimal) -> Decimal {
    if increment <= Decimal::ZERO {
        return ltp.trunc();
    }
    let remainder = ltp % increment;
    let strike = if remainder > increment / Decimal::TWO {
        ltp + (increment - remainder)
    } else {
        ltp - remainder
    };
    strike.trunc()
}

/// Stop-loss percentage for a contract expiring at `expiry`, seen at `now`.
#[must_use]
pub fn stop_loss_percentage(expiry: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let remaining = expiry - now;
    if remaining < Duration::zero() {
        EXPIRED_STOP_PCT
    } else if remaining < Duration::hours(24) {
        EXPIRY_DAY_STOP_PCT
    } else {
        DEFAULT_STOP_PCT
    }
}

/// Trigger and limit price for a stop `pct` percent above `average_price`.
///
/// The trigger is floored to one decimal place; the limit is the floored
/// whole trigger plus [`STOP_LIMIT_BUFFER`].
#[must_use]
pub fn stop_loss_prices(average_price: Decimal, pct: u32) -> (Decimal, Decimal) {
    let raw = average_price * Decimal::from(100 + pct) / Decimal::ONE_HUNDRED;
    let trigger = (raw * Decimal::TEN).floor() / Decimal::TEN;
    let limit = trigger.floor() + Decimal::from(STOP_LIMIT_BUFFER);
    (trigger.round_dp(1), limit)
}

/// Builds sell legs and their protective stops from configuration and
/// instrument lookups.
pub struct LegCalculator {
    resolver: Arc<dyn SymbolResolver>,
    config: StrategyConfig,
    clock: Arc<dyn Clock>,
}

impl LegCalculator {
    #[must_use]
    pub fn new(resolver: Arc<dyn SymbolResolver>, config: StrategyConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            resolver,
            config,
            clock,
        }
    }

    /// ATM strike from the index's current price.
    ///
    /// # Errors
    ///
    /// Fails if the quote cannot be resolved or the increment is not positive.
    pub async fn compute_strike(&self) -> Result<Decimal> {
        let increment = self.config.strike_increment;
        if increment <= Decimal::ZERO {
            return Err(StrategyError::config(format!(
                "strike increment must be positive, got {increment}"
            )));
        }
        let ltp = self.resolver.resolve_atm_input(&self.config.index_symbol).await?;
        let strike = atm_strike(ltp, increment);
        info!(index = %self.config.index_symbol, ltp = %ltp, strike = %strike, "Computed ATM strike");
        Ok(strike)
    }

    /// Fully specified sell leg for one side of the straddle.
    ///
    /// # Errors
    ///
    /// Fails on a lookup error, or with a config error if the lot multiplier
    /// is missing or invalid.
    pub async fn calculate_leg(&self, option_type: OptionType, strike: Decimal) -> Result<Position> {
        let cfg = &self.config;
        info!(option = %option_type, strike = %strike, "Calculating leg");

        let symbol = self
            .resolver
            .resolve_symbol(&cfg.underlying, cfg.expiry_bucket, cfg.week_offset, strike, option_type)
            .await?;
        let lot_size = self.resolver.resolve_lot_size(&symbol).await?;
        let expiry = self
            .resolver
            .resolve_expiry(&cfg.underlying, cfg.expiry_bucket, cfg.week_offset, strike, option_type)
            .await?;
        let quantity = lot_size
            .checked_mul(cfg.lot_multiplier()?)
            .ok_or_else(|| StrategyError::config("leg quantity overflows"))?;

        debug!(symbol, lot_size, quantity, expiry = %expiry, "Leg resolved");
        Ok(Position {
            trading_symbol: symbol,
            exchange: cfg.exchange.clone(),
            product: ProductType::Nrml,
            transaction_type: TransactionType::Sell,
            order_type: OrderType::Market,
            quantity,
            lot_size,
            strike,
            expiry: Some(expiry),
            option_type: Some(option_type),
            ..Position::default()
        })
    }

    /// Buy-side stop-loss protecting an already placed sell leg.
    ///
    /// # Errors
    ///
    /// Fails if the sell leg has not been placed or carries no expiry.
    pub fn calculate_stop_loss_leg(&self, sell_leg: &Position) -> Result<Position> {
        if !sell_leg.is_placed() {
            return Err(StrategyError::resolution("stop-loss requested for an unplaced leg"));
        }
        let expiry = sell_leg.expiry.ok_or_else(|| {
            StrategyError::resolution(format!("{}: leg has no expiry", sell_leg.trading_symbol))
        })?;

        let pct = stop_loss_percentage(expiry, self.clock.now());
        let (trigger, limit) = stop_loss_prices(sell_leg.average_price, pct);
        info!(
            symbol = %sell_leg.trading_symbol,
            average_price = %sell_leg.average_price,
            pct,
            trigger = %trigger,
            limit = %limit,
            "Calculated stop-loss leg"
        );

        let mut stop = sell_leg.clone();
        stop.transaction_type = sell_leg.transaction_type.flipped();
        stop.order_type = OrderType::StopLoss;
        stop.trigger_price = trigger;
        stop.price = limit;
        stop.clear_order();
        Ok(stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use short_straddle_core::{ExpiryBucket, RawSetting};

    struct MockResolver {
        ltp: Decimal,
        expiry: DateTime<Utc>,
    }

    #[async_trait]
    impl SymbolResolver for MockResolver {
        async fn resolve_symbol(
            &self,
            underlying: &str,
            _bucket: ExpiryBucket,
            _week_offset: u32,
            strike: Decimal,
            option_type: OptionType,
        ) -> Result<String> {
            Ok(format!("{underlying}{strike}{option_type}"))
        }

        async fn resolve_expiry(
            &self,
            _underlying: &str,
            _bucket: ExpiryBucket,
            _week_offset: u32,
            _strike: Decimal,
            _option_type: OptionType,
        ) -> Result<DateTime<Utc>> {
            Ok(self.expiry)
        }

        async fn resolve_lot_size(&self, _symbol: &str) -> Result<u32> {
            Ok(50)
        }

        async fn resolve_atm_input(&self, _index_symbol: &str) -> Result<Decimal> {
            Ok(self.ltp)
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 7, 0, 0).unwrap()
    }

    fn calculator(ltp: Decimal, multiplier: Option<RawSetting>) -> LegCalculator {
        let resolver = Arc::new(MockResolver {
            ltp,
            expiry: now() + Duration::days(3),
        });
        let config = StrategyConfig {
            lot_multiplier: multiplier,
            ..StrategyConfig::default()
        };
        LegCalculator::new(resolver, config, Arc::new(ManualClock::new(now())))
    }

    #[test]
    fn test_atm_strike_rounding() {
        assert_eq!(atm_strike(dec!(17530), dec!(50)), dec!(17550));
        assert_eq!(atm_strike(dec!(17520), dec!(50)), dec!(17500));
        assert_eq!(atm_strike(dec!(17560), dec!(50)), dec!(17550));
        assert_eq!(atm_strike(dec!(17550), dec!(50)), dec!(17550));
        assert_eq!(atm_strike(dec!(17530.75), dec!(50)), dec!(17550));
    }

    #[test]
    fn test_atm_strike_tie_rounds_down() {
        assert_eq!(atm_strike(dec!(17525), dec!(50)), dec!(17500));
        assert_eq!(atm_strike(dec!(17525.05), dec!(50)), dec!(17550));
    }

    #[test]
    fn test_stop_loss_percentage_by_time_to_expiry() {
        let now = now();
        assert_eq!(stop_loss_percentage(now - Duration::minutes(1), now), 70);
        assert_eq!(stop_loss_percentage(now, now), 40);
        assert_eq!(stop_loss_percentage(now + Duration::hours(23), now), 40);
        assert_eq!(stop_loss_percentage(now + Duration::hours(24), now), 30);
        assert_eq!(stop_loss_percentage(now + Duration::days(6), now), 30);
    }

    #[test]
    fn test_stop_loss_prices() {
        assert_eq!(stop_loss_prices(dec!(100), 30), (dec!(130.0), dec!(135)));
        assert_eq!(stop_loss_prices(dec!(87.35), 40), (dec!(122.2), dec!(127)));
        assert_eq!(stop_loss_prices(dec!(99.99), 70), (dec!(169.9), dec!(174)));
    }

    #[tokio::test]
    async fn test_compute_strike_uses_index_quote() {
        let calc = calculator(dec!(24860), Some(RawSetting::Number(1)));
        assert_eq!(calc.compute_strike().await.unwrap(), dec!(24850));
    }

    #[tokio::test]
    async fn test_calculate_leg() {
        let calc = calculator(dec!(24860), Some(RawSetting::Number(2)));
        let leg = calc.calculate_leg(OptionType::Put, dec!(24850)).await.unwrap();
        assert_eq!(leg.trading_symbol, "NIFTY24850PE");
        assert_eq!(leg.exchange, "NFO");
        assert_eq!(leg.transaction_type, TransactionType::Sell);
        assert_eq!(leg.order_type, OrderType::Market);
        assert_eq!(leg.product, ProductType::Nrml);
        assert_eq!(leg.lot_size, 50);
        assert_eq!(leg.quantity, 100);
        assert_eq!(leg.option_type, Some(OptionType::Put));
        assert_eq!(leg.expiry, Some(now() + Duration::days(3)));
        assert!(leg.order_id.is_none());
    }

    #[tokio::test]
    async fn test_calculate_leg_requires_lot_multiplier() {
        let calc = calculator(dec!(24860), Some(RawSetting::Text("lots".to_string())));
        let err = calc.calculate_leg(OptionType::Call, dec!(24850)).await.unwrap_err();
        assert!(matches!(err, StrategyError::Config(_)));
    }

    #[tokio::test]
    async fn test_stop_loss_leg_flips_sell_leg() {
        let calc = calculator(dec!(24860), Some(RawSetting::Number(1)));
        let mut sell = calc.calculate_leg(OptionType::Call, dec!(24850)).await.unwrap();
        sell.average_price = dec!(100);
        sell.order_id = Some("A1".to_string());
        sell.status = Some(short_straddle_core::OrderStatus::Complete);

        let stop = calc.calculate_stop_loss_leg(&sell).unwrap();
        assert_eq!(stop.trading_symbol, sell.trading_symbol);
        assert_eq!(stop.transaction_type, TransactionType::Buy);
        assert_eq!(stop.order_type, OrderType::StopLoss);
        assert_eq!(stop.product, sell.product);
        assert_eq!(stop.quantity, sell.quantity);
        assert_eq!(stop.trigger_price, dec!(130.0));
        assert_eq!(stop.price, dec!(135));
        assert!(stop.order_id.is_none());
        assert!(stop.status.is_none());
    }

    #[test]
    fn test_stop_loss_leg_rejects_empty_slot() {
        let calc = calculator(dec!(24860), Some(RawSetting::Number(1)));
        assert!(calc.calculate_stop_loss_leg(&Position::default()).is_err());
    }
}
