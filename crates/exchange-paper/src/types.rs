//! NSE option contract naming.

use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;

use short_straddle_core::OptionType;

/// An index option contract on the NSE derivatives segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionContract {
    pub underlying: String,
    pub expiry: NaiveDate,
    pub strike: Decimal,
    pub option_type: OptionType,
}

/// True when no later expiry with the same weekday falls in the same month.
#[must_use]
pub fn is_monthly_expiry(date: NaiveDate) -> bool {
    (date + Duration::days(7)).month() != date.month()
}

/// Single-character month code used by weekly symbols: 1-9, then O, N, D.
fn weekly_month_code(month: u32) -> String {
    match month {
        10 => "O".to_string(),
        11 => "N".to_string(),
        12 => "D".to_string(),
        m => m.to_string(),
    }
}

impl OptionContract {
    /// Exchange trading symbol.
    ///
    /// Weekly contracts read `NIFTY24O1724850CE` (year, month code, day);
    /// the last expiry of a month reads `NIFTY24OCT24850CE`.
    #[must_use]
    pub fn trading_symbol(&self) -> String {
        let year = self.expiry.year() % 100;
        let strike = self.strike.normalize();
        if is_monthly_expiry(self.expiry) {
            format!(
                "{}{:02}{}{}{}",
                self.underlying,
                year,
                self.expiry.format("%b").to_string().to_uppercase(),
                strike,
                self.option_type
            )
        } else {
            format!(
                "{}{:02}{}{:02}{}{}",
                self.underlying,
                year,
                weekly_month_code(self.expiry.month()),
                self.expiry.day(),
                strike,
                self.option_type
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn contract(expiry: NaiveDate, option_type: OptionType) -> OptionContract {
        OptionContract {
            underlying: "NIFTY".to_string(),
            expiry,
            strike: dec!(24850),
            option_type,
        }
    }

    #[test]
    fn weekly_symbol_uses_month_code_and_day() {
        let expiry = NaiveDate::from_ymd_opt(2024, 10, 17).unwrap();
        assert_eq!(contract(expiry, OptionType::Call).trading_symbol(), "NIFTY24O1724850CE");

        let expiry = NaiveDate::from_ymd_opt(2025, 3, 6).unwrap();
        assert_eq!(contract(expiry, OptionType::Put).trading_symbol(), "NIFTY2530624850PE");
    }

    #[test]
    fn last_expiry_of_month_uses_monthly_symbol() {
        let expiry = NaiveDate::from_ymd_opt(2024, 10, 31).unwrap();
        assert!(is_monthly_expiry(expiry));
        assert_eq!(contract(expiry, OptionType::Call).trading_symbol(), "NIFTY24OCT24850CE");
    }

    #[test]
    fn strike_is_rendered_without_trailing_zeros() {
        let mut c = contract(NaiveDate::from_ymd_opt(2024, 10, 17).unwrap(), OptionType::Call);
        c.strike = dec!(24850.00);
        assert_eq!(c.trading_symbol(), "NIFTY24O1724850CE");
    }
}
