//! Options chain lookups — expiries, symbols, lot sizes.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday};
use rust_decimal::Decimal;
use tracing::debug;

use short_straddle_core::{Broker, ExpiryBucket, OptionType, Result, StrategyError, SymbolResolver};

use crate::client::PaperBroker;
use crate::types::{is_monthly_expiry, OptionContract};

fn days_until(from: Weekday, to: Weekday) -> i64 {
    i64::from((to.num_days_from_monday() + 7 - from.num_days_from_monday()) % 7)
}

/// Weekly expiry `week_offset` weeks after the nearest live one.
///
/// On expiry day the contract stays current until `expiry_time`.
#[must_use]
pub fn weekly_expiry(now: NaiveDateTime, weekday: Weekday, expiry_time: NaiveTime, week_offset: u32) -> NaiveDate {
    let today = now.date();
    let mut ahead = days_until(today.weekday(), weekday);
    if ahead == 0 && now.time() >= expiry_time {
        ahead = 7;
    }
    today + Duration::days(ahead + 7 * i64::from(week_offset))
}

fn last_weekday_of_month(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let last_day = NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()?;
    let back = days_until(weekday, last_day.weekday());
    Some(last_day - Duration::days(back))
}

/// Monthly expiry `month_offset` months after the nearest live one.
#[must_use]
pub fn monthly_expiry(
    now: NaiveDateTime,
    weekday: Weekday,
    expiry_time: NaiveTime,
    month_offset: u32,
) -> Option<NaiveDate> {
    let today = now.date();
    let mut year = today.year();
    let mut month = today.month();
    let current = last_weekday_of_month(year, month, weekday)?;
    let mut skip = month_offset;
    if current < today || (current == today && now.time() >= expiry_time) {
        skip += 1;
    }
    for _ in 0..skip {
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    last_weekday_of_month(year, month, weekday)
}

impl PaperBroker {
    fn expiry_date(&self, bucket: ExpiryBucket, offset: u32) -> Result<NaiveDate> {
        let now = self.now().with_timezone(&self.timezone).naive_local();
        let weekday = self.config.expiry_weekday;
        let time = self.config.expiry_time;
        match bucket {
            ExpiryBucket::Weekly => Ok(weekly_expiry(now, weekday, time, offset)),
            ExpiryBucket::Monthly => monthly_expiry(now, weekday, time, offset)
                .ok_or_else(|| StrategyError::resolution("monthly expiry out of range")),
        }
    }
}

#[async_trait]
impl SymbolResolver for PaperBroker {
    async fn resolve_symbol(
        &self,
        underlying: &str,
        bucket: ExpiryBucket,
        week_offset: u32,
        strike: Decimal,
        option_type: OptionType,
    ) -> Result<String> {
        if strike <= Decimal::ZERO {
            return Err(StrategyError::resolution(format!("invalid strike {strike}")));
        }
        let contract = OptionContract {
            underlying: underlying.to_uppercase(),
            expiry: self.expiry_date(bucket, week_offset)?,
            strike,
            option_type,
        };
        let symbol = contract.trading_symbol();
        debug!(symbol, monthly = is_monthly_expiry(contract.expiry), "Resolved option symbol");
        Ok(symbol)
    }

    async fn resolve_expiry(
        &self,
        _underlying: &str,
        bucket: ExpiryBucket,
        week_offset: u32,
        _strike: Decimal,
        _option_type: OptionType,
    ) -> Result<DateTime<Utc>> {
        let date = self.expiry_date(bucket, week_offset)?;
        self.timezone
            .from_local_datetime(&date.and_time(self.config.expiry_time))
            .single()
            .map(|local| local.with_timezone(&Utc))
            .ok_or_else(|| StrategyError::resolution(format!("ambiguous expiry time on {date}")))
    }

    async fn resolve_lot_size(&self, symbol: &str) -> Result<u32> {
        if symbol.is_empty() {
            return Err(StrategyError::resolution("lot size requested for empty symbol"));
        }
        Ok(self.config.lot_size)
    }

    async fn resolve_atm_input(&self, index_symbol: &str) -> Result<Decimal> {
        self.last_traded_price(index_symbol)
            .await
            .map_err(|e| StrategyError::resolution(format!("{index_symbol}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use short_straddle_core::PaperConfig;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn close() -> NaiveTime {
        NaiveTime::from_hms_opt(15, 30, 0).unwrap()
    }

    #[test]
    fn weekly_expiry_rolls_after_close_on_expiry_day() {
        // 2026-10-20 is a Tuesday.
        let monday = at(2026, 10, 19, 12, 30);
        assert_eq!(
            weekly_expiry(monday, Weekday::Tue, close(), 0),
            NaiveDate::from_ymd_opt(2026, 10, 20).unwrap()
        );
        let expiry_morning = at(2026, 10, 20, 10, 0);
        assert_eq!(
            weekly_expiry(expiry_morning, Weekday::Tue, close(), 0),
            NaiveDate::from_ymd_opt(2026, 10, 20).unwrap()
        );
        let expiry_evening = at(2026, 10, 20, 15, 45);
        assert_eq!(
            weekly_expiry(expiry_evening, Weekday::Tue, close(), 0),
            NaiveDate::from_ymd_opt(2026, 10, 27).unwrap()
        );
        assert_eq!(
            weekly_expiry(monday, Weekday::Tue, close(), 1),
            NaiveDate::from_ymd_opt(2026, 10, 27).unwrap()
        );
    }

    #[test]
    fn monthly_expiry_is_last_weekday_of_month() {
        assert_eq!(
            monthly_expiry(at(2026, 10, 19, 12, 30), Weekday::Tue, close(), 0),
            NaiveDate::from_ymd_opt(2026, 10, 27)
        );
        assert_eq!(
            monthly_expiry(at(2026, 10, 28, 9, 15), Weekday::Tue, close(), 0),
            NaiveDate::from_ymd_opt(2026, 11, 24)
        );
        assert_eq!(
            monthly_expiry(at(2026, 12, 30, 9, 15), Weekday::Tue, close(), 0),
            NaiveDate::from_ymd_opt(2027, 1, 26)
        );
    }

    #[tokio::test]
    async fn resolves_symbol_expiry_and_lot_size() {
        // 2026-10-19 12:30 IST
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 7, 0, 0).unwrap();
        let broker = PaperBroker::new(PaperConfig::default(), chrono_tz::Asia::Kolkata).with_now(now);

        let symbol = broker
            .resolve_symbol("nifty", ExpiryBucket::Weekly, 0, dec!(24850), OptionType::Call)
            .await
            .unwrap();
        assert_eq!(symbol, "NIFTY26O2024850CE");

        let expiry = broker
            .resolve_expiry("NIFTY", ExpiryBucket::Weekly, 0, dec!(24850), OptionType::Call)
            .await
            .unwrap();
        assert_eq!(expiry, Utc.with_ymd_and_hms(2026, 10, 20, 10, 0, 0).unwrap());

        assert_eq!(broker.resolve_lot_size(&symbol).await.unwrap(), 75);
        assert_eq!(broker.resolve_atm_input("NIFTY 50").await.unwrap(), dec!(24860));
    }

    #[tokio::test]
    async fn rejects_non_positive_strikes() {
        let broker = PaperBroker::new(PaperConfig::default(), chrono_tz::Asia::Kolkata);
        let err = broker
            .resolve_symbol("NIFTY", ExpiryBucket::Weekly, 0, Decimal::ZERO, OptionType::Put)
            .await
            .unwrap_err();
        assert!(matches!(err, StrategyError::Resolution(_)));
    }
}
