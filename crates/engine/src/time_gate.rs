//! Blocks the strategy until wall-clock time enters a daily window.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;
use tracing::{info, warn};

use short_straddle_core::{Result, StrategyError, WindowConfig};

use crate::clock::{Clock, StopToken};

/// Half-open daily interval `[start, end)` in the strategy timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    #[must_use]
    pub const fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Windows with `start > end` wrap past midnight.
    #[must_use]
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start <= self.end {
            self.start <= time && time < self.end
        } else {
            time >= self.start || time < self.end
        }
    }

    /// The window's occurrence that opens on `day`, as local date-times.
    /// A wrapping window closes on the following day.
    #[must_use]
    pub fn bounds_on(&self, day: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let start = day.and_time(self.start);
        let mut end = day.and_time(self.end);
        if self.start > self.end {
            end += chrono::Duration::days(1);
        }
        (start, end)
    }
}

impl From<WindowConfig> for TimeWindow {
    fn from(config: WindowConfig) -> Self {
        Self::new(config.start, config.end)
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

pub struct TimeGate {
    clock: Arc<dyn Clock>,
    timezone: Tz,
    poll_interval: Duration,
    stop: StopToken,
}

impl TimeGate {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, timezone: Tz, poll_interval: Duration, stop: StopToken) -> Self {
        Self {
            clock,
            timezone,
            poll_interval,
            stop,
        }
    }

    #[must_use]
    pub fn local_now(&self) -> DateTime<Tz> {
        self.clock.now().with_timezone(&self.timezone)
    }

    /// Sleep until the next check: one poll interval, shortened so the
    /// check lands exactly on the window start.
    fn next_pause(&self, now: NaiveDateTime, start: NaiveDateTime) -> Duration {
        (start - now)
            .to_std()
            .ok()
            .filter(|until_start| !until_start.is_zero())
            .map_or(self.poll_interval, |until_start| until_start.min(self.poll_interval))
    }

    /// Returns once the local time is inside the occurrence of `window`
    /// that opens on `day`.
    ///
    /// # Errors
    ///
    /// Returns `StrategyError::WindowMissed` once that occurrence has
    /// closed, and `StrategyError::Cancelled` if the stop token fires first.
    pub async fn wait_for(&self, label: &str, window: TimeWindow, day: NaiveDate) -> Result<()> {
        let (start, end) = window.bounds_on(day);
        let mut announced = false;
        loop {
            let now = self.local_now();
            let local = now.naive_local();
            if local >= end {
                warn!(label, window = %window, day = %day, time = %now, "Window already closed");
                return Err(StrategyError::WindowMissed(format!("{label} window {window} on {day}")));
            }
            if local >= start && window.contains(local.time()) {
                info!(label, window = %window, time = %now, "Entered window");
                return Ok(());
            }
            if self.stop.is_cancelled() {
                return Err(StrategyError::Cancelled);
            }
            if !announced {
                info!(label, window = %window, time = %now, "Waiting for window");
                announced = true;
            }

            let pause = self.next_pause(local, start);
            tokio::select! {
                () = self.clock.sleep(pause) => {}
                () = self.stop.cancelled() => return Err(StrategyError::Cancelled),
            }
        }
    }
}
