//! Fill simulation.

use rust_decimal::Decimal;

use short_straddle_core::{OrderStatus, OrderType, PaperConfig, Position};

/// Price and status a paper order ends up with.
///
/// Market orders fill at the configured premium. Stop-loss orders stay
/// pending unless stops are configured to trigger, in which case they fill
/// at their limit price.
#[must_use]
pub fn simulate_fill(config: &PaperConfig, order: &Position) -> (Decimal, OrderStatus) {
    match order.order_type {
        OrderType::Market => (config.premium, OrderStatus::Complete),
        OrderType::Limit => (order.price, OrderStatus::Complete),
        OrderType::StopLoss if config.stops_trigger => (order.price, OrderStatus::Complete),
        OrderType::StopLoss => (Decimal::ZERO, OrderStatus::TriggerPending),
    }
}
