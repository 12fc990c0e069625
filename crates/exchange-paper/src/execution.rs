//! Order execution — place and cancel paper orders.

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{debug, info};

use short_straddle_core::{Broker, OrderStatus, Position, Result, StrategyError};

use crate::client::PaperBroker;
use crate::paper::simulate_fill;

#[async_trait]
impl Broker for PaperBroker {
    async fn last_traded_price(&self, symbol: &str) -> Result<Decimal> {
        let traded = self
            .submitted_orders()
            .iter()
            .any(|order| order.trading_symbol == symbol);
        let price = if traded {
            self.config.premium
        } else {
            self.config.index_ltp
        };
        debug!(symbol, price = %price, "Paper quote");
        Ok(price)
    }

    async fn place_order(&self, position: &mut Position) -> Result<()> {
        if position.trading_symbol.is_empty() {
            return Err(StrategyError::broker("order has no trading symbol"));
        }
        if position.quantity == 0 {
            return Err(StrategyError::broker(format!(
                "{}: quantity must be positive",
                position.trading_symbol
            )));
        }

        let (fill_price, status) = simulate_fill(&self.config, position);
        position.order_id = Some(self.next_order_id());
        position.status = Some(status);
        if status == OrderStatus::Complete {
            position.average_price = fill_price;
        }
        self.record(position);

        info!(
            order_id = ?position.order_id,
            symbol = %position.trading_symbol,
            side = %position.transaction_type,
            quantity = position.quantity,
            price = %position.average_price,
            status = ?position.status,
            "Paper order accepted"
        );
        Ok(())
    }

    async fn cancel_order(&self, position: &mut Position) -> Result<()> {
        let order_id = position
            .order_id
            .clone()
            .ok_or_else(|| StrategyError::broker(format!("{}: no order id", position.trading_symbol)))?;

        let mut book = self.order_status.lock();
        let status = book
            .get_mut(&order_id)
            .ok_or_else(|| StrategyError::broker(format!("order {order_id} not found")))?;
        if matches!(status, OrderStatus::Open | OrderStatus::TriggerPending) {
            *status = OrderStatus::Cancelled;
        }
        position.status = Some(*status);

        info!(order_id, status = %status, "Paper cancel processed");
        Ok(())
    }
}
