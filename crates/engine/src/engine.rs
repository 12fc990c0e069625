//! The daily short-straddle cycle as a resumable state machine.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info, warn};

use short_straddle_core::{
    Broker, DocumentStore, OptionType, Position, Result, StrategyConfig, StrategyError, SymbolResolver,
};

use crate::clock::{Clock, StopToken};
use crate::executor::OrderExecutor;
use crate::legs::LegCalculator;
use crate::retry::RetryPolicy;
use crate::snapshot::{SnapshotHandle, SnapshotRepository, StrategySnapshot};
use crate::time_gate::{TimeGate, TimeWindow};

/// States of one daily cycle, visited strictly in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum EnginePhase {
    Init,
    WaitEntry,
    ComputeStrike,
    PlaceSellLegs,
    Checkpoint1,
    PlaceStopLegs,
    Checkpoint2,
    WaitExit,
    CancelStops,
    Flatten,
    Checkpoint3,
    Done,
}

impl fmt::Display for EnginePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What a finished cycle did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub trading_day: NaiveDate,
    /// `None` when both sell legs were resumed from the checkpoint.
    pub strike: Option<Decimal>,
    pub sell_call: Position,
    pub sell_put: Position,
    pub stop_loss_call: Position,
    pub stop_loss_put: Position,
    /// Closing orders submitted at the exit window, including any placed by
    /// an earlier run of the same day.
    pub flattened: Vec<Position>,
    /// True when the day had already been closed out by an earlier run.
    pub already_completed: bool,
}

impl CycleReport {
    fn from_snapshot(snapshot: &StrategySnapshot) -> Self {
        Self {
            trading_day: snapshot.trading_day,
            strike: None,
            sell_call: snapshot.sell_call.clone(),
            sell_put: snapshot.sell_put.clone(),
            stop_loss_call: snapshot.stop_loss_call.clone(),
            stop_loss_put: snapshot.stop_loss_put.clone(),
            flattened: snapshot.closing_legs.clone(),
            already_completed: snapshot.is_completed(),
        }
    }
}

pub struct StrategyEngine {
    timezone: Tz,
    entry_window: TimeWindow,
    exit_window: TimeWindow,
    clock: Arc<dyn Clock>,
    gate: TimeGate,
    calculator: LegCalculator,
    executor: OrderExecutor,
    snapshots: SnapshotRepository,
    phase: EnginePhase,
}

impl StrategyEngine {
    /// Wires the engine from configuration and its collaborators.
    ///
    /// # Errors
    ///
    /// Returns `StrategyError::Config` for an unknown timezone.
    pub fn new(
        config: StrategyConfig,
        broker: Arc<dyn Broker>,
        resolver: Arc<dyn SymbolResolver>,
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        stop: StopToken,
    ) -> Result<Self> {
        let timezone = config.timezone()?;
        let poll = Duration::from_secs(config.poll_interval_secs.max(1));
        let policy = RetryPolicy::from(config.retry);

        Ok(Self {
            timezone,
            entry_window: config.entry_window.into(),
            exit_window: config.exit_window.into(),
            gate: TimeGate::new(clock.clone(), timezone, poll, stop.clone()),
            executor: OrderExecutor::new(broker, clock.clone(), stop, policy),
            snapshots: SnapshotRepository::new(store, config.name.clone()),
            calculator: LegCalculator::new(resolver, config, clock.clone()),
            clock,
            phase: EnginePhase::Init,
        })
    }

    #[must_use]
    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    fn enter(&mut self, phase: EnginePhase) {
        info!(from = %self.phase, to = %phase, "Engine phase");
        self.phase = phase;
    }

    async fn checkpoint(&self, handle: &SnapshotHandle, snapshot: &mut StrategySnapshot) -> Result<()> {
        self.snapshots.save(handle, snapshot, self.clock.now()).await?;
        info!(placed = snapshot.placed_legs(), phase = %self.phase, "Checkpoint persisted");
        Ok(())
    }

    /// Keeps orders placed or cancelled before a failure so a restart does
    /// not repeat them, then hands the original error back.
    async fn checkpoint_after_failure(
        &self,
        handle: &SnapshotHandle,
        snapshot: &mut StrategySnapshot,
        err: StrategyError,
    ) -> StrategyError {
        error!(phase = %self.phase, error = %err, "Cycle step failed");
        if let Err(save_err) = self.checkpoint(handle, snapshot).await {
            warn!(error = %save_err, "Could not persist progress after failure");
        }
        err
    }

    /// Runs one trading day's cycle to completion.
    ///
    /// Legs already present in the day's snapshot are not placed again.
    ///
    /// # Errors
    ///
    /// Any unrecovered error aborts the run. Progress persisted so far stays
    /// in the store for the next run to resume from.
    pub async fn run(&mut self) -> Result<CycleReport> {
        self.phase = EnginePhase::Init;
        let trading_day = self.clock.now().with_timezone(&self.timezone).date_naive();
        let (mut snapshot, handle) = self.snapshots.load_or_create(trading_day).await?;
        if snapshot.is_completed() {
            info!(day = %trading_day, "Cycle already completed for this trading day");
            self.enter(EnginePhase::Done);
            return Ok(CycleReport::from_snapshot(&snapshot));
        }
        if snapshot.placed_legs() > 0 {
            info!(day = %trading_day, placed = snapshot.placed_legs(), "Resuming from checkpoint");
        }

        self.enter(EnginePhase::WaitEntry);
        if snapshot.sell_call.is_placed() && snapshot.sell_put.is_placed() {
            info!(day = %trading_day, "Sell legs already placed, not waiting for entry");
        } else {
            self.gate.wait_for("entry", self.entry_window, trading_day).await?;
        }

        self.enter(EnginePhase::ComputeStrike);
        let strike = if snapshot.sell_call.is_placed() && snapshot.sell_put.is_placed() {
            None
        } else {
            Some(self.calculator.compute_strike().await?)
        };

        self.enter(EnginePhase::PlaceSellLegs);
        if let Some(strike) = strike {
            if let Err(e) = self.place_sell_legs(&mut snapshot, strike).await {
                return Err(self.checkpoint_after_failure(&handle, &mut snapshot, e).await);
            }
        }

        self.enter(EnginePhase::Checkpoint1);
        self.checkpoint(&handle, &mut snapshot).await?;

        self.enter(EnginePhase::PlaceStopLegs);
        if let Err(e) = self.place_stop_legs(&mut snapshot).await {
            return Err(self.checkpoint_after_failure(&handle, &mut snapshot, e).await);
        }

        self.enter(EnginePhase::Checkpoint2);
        self.checkpoint(&handle, &mut snapshot).await?;

        self.enter(EnginePhase::WaitExit);
        self.gate.wait_for("exit", self.exit_window, trading_day).await?;

        self.enter(EnginePhase::CancelStops);
        let cancelled = self
            .executor
            .cancel_orders(&mut snapshot.stop_loss_call, &mut snapshot.stop_loss_put)
            .await;
        if let Err(e) = cancelled {
            return Err(self.checkpoint_after_failure(&handle, &mut snapshot, e).await);
        }
        self.checkpoint(&handle, &mut snapshot).await?;

        self.enter(EnginePhase::Flatten);
        let open_legs: Vec<Position> = [
            (&snapshot.stop_loss_call, &snapshot.sell_call),
            (&snapshot.stop_loss_put, &snapshot.sell_put),
        ]
        .into_iter()
        .filter(|(stop, sell)| !stop.is_complete() && !snapshot.is_flattened(sell))
        .map(|(_, sell)| sell.clone())
        .collect();
        if open_legs.is_empty() {
            info!("No open legs left to flatten");
        }
        let flattened = self
            .executor
            .flatten_positions(&open_legs, &mut snapshot.closing_legs)
            .await;
        if let Err(e) = flattened {
            return Err(self.checkpoint_after_failure(&handle, &mut snapshot, e).await);
        }

        let mut report = CycleReport::from_snapshot(&snapshot);
        report.strike = strike;

        self.enter(EnginePhase::Checkpoint3);
        snapshot.clear();
        snapshot.completed_at = Some(self.clock.now());
        self.checkpoint(&handle, &mut snapshot).await?;

        self.enter(EnginePhase::Done);
        info!(
            day = %trading_day,
            strike = ?strike,
            flattened = report.flattened.len(),
            "Cycle complete"
        );
        Ok(report)
    }

    async fn place_sell_legs(&self, snapshot: &mut StrategySnapshot, strike: Decimal) -> Result<()> {
        for option_type in [OptionType::Call, OptionType::Put] {
            let slot = match option_type {
                OptionType::Call => &mut snapshot.sell_call,
                OptionType::Put => &mut snapshot.sell_put,
            };
            if slot.is_placed() {
                info!(option = %option_type, symbol = %slot.trading_symbol, "Sell leg already placed");
                continue;
            }
            let mut leg = self.calculator.calculate_leg(option_type, strike).await?;
            self.executor.place_leg(&mut leg).await?;
            *slot = leg;
        }
        Ok(())
    }

    async fn place_stop_legs(&self, snapshot: &mut StrategySnapshot) -> Result<()> {
        let pairs = [
            (OptionType::Call, &snapshot.sell_call, &mut snapshot.stop_loss_call),
            (OptionType::Put, &snapshot.sell_put, &mut snapshot.stop_loss_put),
        ];
        for (option_type, sell, stop) in pairs {
            if stop.is_placed() {
                info!(option = %option_type, symbol = %stop.trading_symbol, "Stop-loss leg already placed");
                continue;
            }
            let mut leg = self.calculator.calculate_stop_loss_leg(sell)?;
            self.executor.place_leg(&mut leg).await?;
            *stop = leg;
        }
        Ok(())
    }
}
