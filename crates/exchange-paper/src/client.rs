//! Paper brokerage state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use parking_lot::Mutex;
use tracing::info;

use short_straddle_core::{OrderStatus, PaperConfig, Position};

/// Simulated brokerage: fills market orders at a fixed premium, parks
/// stop-loss orders as pending and answers instrument lookups locally.
pub struct PaperBroker {
    pub(crate) config: PaperConfig,
    pub(crate) timezone: Tz,
    /// Fixed "now" for expiry resolution; wall clock when unset.
    pub(crate) now_override: Option<DateTime<Utc>>,
    next_order: AtomicU64,
    pub(crate) order_status: Mutex<HashMap<String, OrderStatus>>,
    submitted: Mutex<Vec<Position>>,
}

impl PaperBroker {
    #[must_use]
    pub fn new(config: PaperConfig, timezone: Tz) -> Self {
        info!(
            index_ltp = %config.index_ltp,
            premium = %config.premium,
            lot_size = config.lot_size,
            stops_trigger = config.stops_trigger,
            "Paper broker ready"
        );
        Self {
            config,
            timezone,
            now_override: None,
            next_order: AtomicU64::new(1),
            order_status: Mutex::new(HashMap::new()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Pins the time used for expiry resolution.
    #[must_use]
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now_override = Some(now);
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &PaperConfig {
        &self.config
    }

    /// Every order accepted so far, as filled.
    pub fn submitted_orders(&self) -> Vec<Position> {
        self.submitted.lock().clone()
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.now_override.unwrap_or_else(Utc::now)
    }

    pub(crate) fn next_order_id(&self) -> String {
        format!("PAPER-{}", self.next_order.fetch_add(1, Ordering::SeqCst))
    }

    pub(crate) fn record(&self, position: &Position) {
        if let (Some(id), Some(status)) = (&position.order_id, position.status) {
            self.order_status.lock().insert(id.clone(), status);
        }
        self.submitted.lock().push(position.clone());
    }
}
