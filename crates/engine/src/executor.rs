//! Places, cancels and flattens legs through the brokerage.

use std::sync::Arc;

use tracing::{info, warn};

use short_straddle_core::{Broker, OrderType, Position, Result};

use crate::clock::{Clock, StopToken};
use crate::retry::{retry, RetryPolicy};

pub struct OrderExecutor {
    broker: Arc<dyn Broker>,
    clock: Arc<dyn Clock>,
    stop: StopToken,
    policy: RetryPolicy,
}

impl OrderExecutor {
    #[must_use]
    pub fn new(broker: Arc<dyn Broker>, clock: Arc<dyn Clock>, stop: StopToken, policy: RetryPolicy) -> Self {
        Self {
            broker,
            clock,
            stop,
            policy,
        }
    }

    /// Submits `leg`, retrying brokerage failures.
    ///
    /// Each attempt works on a copy, so `leg` is only updated with the
    /// order id, status and fill price of the attempt that succeeded.
    ///
    /// # Errors
    ///
    /// Returns the last brokerage error once attempts are exhausted.
    pub async fn place_leg(&self, leg: &mut Position) -> Result<()> {
        let broker = &self.broker;
        let template: &Position = leg;
        let symbol = template.trading_symbol.clone();
        let max_attempts = self.policy.max_attempts;

        let placed = retry(
            self.policy,
            self.clock.as_ref(),
            &self.stop,
            |attempt, err| {
                warn!(symbol = %symbol, attempt, max_attempts, error = %err, "Order placement failed, retrying");
            },
            || {
                let mut candidate = template.clone();
                async move { broker.place_order(&mut candidate).await.map(|()| candidate) }
            },
        )
        .await?;

        info!(
            symbol = %placed.trading_symbol,
            side = %placed.transaction_type,
            order_id = ?placed.order_id,
            average_price = %placed.average_price,
            "Leg placed"
        );
        *leg = placed;
        Ok(())
    }

    /// Cancels the call-side order and then the put-side order, retrying
    /// brokerage failures like `place_leg`.
    ///
    /// Legs the brokerage already finished with are skipped. Once a leg's
    /// retries are exhausted the sequence aborts; the put side is left
    /// untouched when the call side fails.
    ///
    /// # Errors
    ///
    /// Returns the last brokerage error of the failing cancellation.
    pub async fn cancel_orders(&self, call: &mut Position, put: &mut Position) -> Result<()> {
        for leg in [call, put] {
            if leg.is_terminal() {
                info!(symbol = %leg.trading_symbol, status = ?leg.status, "Order already closed, not cancelling");
                continue;
            }
            self.cancel_leg(leg).await?;
        }
        Ok(())
    }

    async fn cancel_leg(&self, leg: &mut Position) -> Result<()> {
        let broker = &self.broker;
        let template: &Position = leg;
        let symbol = template.trading_symbol.clone();
        let max_attempts = self.policy.max_attempts;

        let cancelled = retry(
            self.policy,
            self.clock.as_ref(),
            &self.stop,
            |attempt, err| {
                warn!(symbol = %symbol, attempt, max_attempts, error = %err, "Order cancellation failed, retrying");
            },
            || {
                let mut candidate = template.clone();
                async move { broker.cancel_order(&mut candidate).await.map(|()| candidate) }
            },
        )
        .await?;

        info!(symbol = %cancelled.trading_symbol, status = ?cancelled.status, "Cancelled order");
        *leg = cancelled;
        Ok(())
    }

    /// Buys back each of `legs` at market, appending every submitted closing
    /// order to `closed` as soon as it is placed.
    ///
    /// # Errors
    ///
    /// Stops at the first leg whose placement fails after retries. Closing
    /// orders placed before the failure stay in `closed`.
    pub async fn flatten_positions(&self, legs: &[Position], closed: &mut Vec<Position>) -> Result<()> {
        for leg in legs {
            let mut closing = leg.clone();
            closing.transaction_type = leg.transaction_type.flipped();
            closing.order_type = OrderType::Market;
            closing.clear_order();
            info!(symbol = %closing.trading_symbol, quantity = closing.quantity, "Flattening position");
            self.place_leg(&mut closing).await?;
            closed.push(closing);
        }
        Ok(())
    }
}
