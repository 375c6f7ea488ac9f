//! Fixed-interval growth clock for Delve.
//!
//! The dungeon grows in batches, one batch per clock tick. The interval is
//! long (seconds, not milliseconds) and the clock can be driven two ways:
//!
//! - **Async**: [`GrowthClock::wait_for_tick`] sleeps on the Tokio timer and
//!   fits inside a `tokio::select!` loop next to a command channel.
//! - **Frame-driven**: [`GrowthClock::advance`] is fed the frame delta by an
//!   external game loop and reports how many ticks became due.
//!
//! An interval of zero disables the clock: `wait_for_tick` pends forever
//! and `advance` never reports a tick.
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         _ = clock.wait_for_tick() => session.on_growth_tick(),
//!     }
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when the clock is polled late.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TickPolicy {
    /// Fire once and resume the cadence from now. Missed ticks are lost.
    #[default]
    Skip,
    /// Fire the missed ticks back to back, at most `max_catchup` extra.
    CatchUp { max_catchup: u32 },
    /// Fire once and keep the original cadence; the backlog drains one
    /// tick per poll.
    Drop,
}

/// Configuration for [`GrowthClock`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Time between growth ticks. Zero disables the clock.
    pub interval: Duration,
    pub policy: TickPolicy,
    /// Random delay (0..jitter) added before the *first* tick only.
    pub initial_jitter: Duration,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            policy: TickPolicy::default(),
            initial_jitter: Duration::ZERO,
        }
    }
}

impl ClockConfig {
    /// Shortest accepted non-zero interval.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Clamp values so the config is safe to use.
    ///
    /// Called automatically by [`GrowthClock::new`]. A non-zero interval
    /// shorter than [`Self::MIN_INTERVAL`] is raised to it.
    pub fn validated(mut self) -> Self {
        if !self.interval.is_zero() && self.interval < Self::MIN_INTERVAL {
            warn!(
                interval_ms = self.interval.as_secs_f64() * 1000.0,
                min_ms = Self::MIN_INTERVAL.as_secs_f64() * 1000.0,
                "growth interval below minimum — clamping"
            );
            self.interval = Self::MIN_INTERVAL;
        }
        self
    }

    /// `None` when the clock is disabled.
    pub fn tick_interval(&self) -> Option<Duration> {
        (!self.interval.is_zero()).then_some(self.interval)
    }
}

// ---------------------------------------------------------------------------
// Tick info
// ---------------------------------------------------------------------------

/// Returned by [`GrowthClock::wait_for_tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickInfo {
    /// Monotonically increasing, starts at 1.
    pub tick: u64,
    /// Always the configured interval.
    pub interval: Duration,
    /// The tick fired more than 10% of an interval late.
    pub overrun: bool,
    /// Ticks dropped by the policy for this firing.
    pub ticks_skipped: u64,
}

/// Counters kept across the clock's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClockMetrics {
    pub total_ticks: u64,
    pub total_overruns: u64,
    pub total_skipped: u64,
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Fixed-interval clock that triggers growth batches.
pub struct GrowthClock {
    config: ClockConfig,
    interval: Option<Duration>,
    tick_count: u64,
    /// Deadline for the async path.
    next_tick: Option<Instant>,
    /// Time accumulated by the frame-driven path since the last tick.
    accumulated: Duration,
    /// Jitter still owed before the first frame-driven tick.
    pending_jitter: Duration,
    paused: bool,
    metrics: ClockMetrics,
}

impl GrowthClock {
    pub fn new(config: ClockConfig) -> Self {
        let config = config.validated();
        let interval = config.tick_interval();

        let jitter = if config.initial_jitter.is_zero() {
            Duration::ZERO
        } else {
            let us = config.initial_jitter.as_micros() as u64;
            Duration::from_micros(rand::rng().random_range(0..us.max(1)))
        };
        let next_tick = interval.map(|d| Instant::now() + d + jitter);

        match interval {
            None => debug!("growth clock created disabled (zero interval)"),
            Some(d) => debug!(
                interval_ms = d.as_secs_f64() * 1000.0,
                jitter_ms = jitter.as_secs_f64() * 1000.0,
                policy = ?config.policy,
                "growth clock created"
            ),
        }

        Self {
            config,
            interval,
            tick_count: 0,
            next_tick,
            accumulated: Duration::ZERO,
            pending_jitter: jitter,
            paused: false,
            metrics: ClockMetrics::default(),
        }
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self::new(ClockConfig::with_interval(interval))
    }

    /// Wait until the next tick is due.
    ///
    /// When disabled or paused this future pends forever, so a surrounding
    /// `tokio::select!` keeps serving its other branches.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let (next, interval) = match (self.next_tick, self.interval) {
            (Some(next), Some(interval)) if !self.paused => (next, interval),
            _ => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        };

        time::sleep_until(next).await;

        let now = Instant::now();
        let late_by = now.saturating_duration_since(next);
        let overrun = late_by > interval / 10;
        let behind = (late_by.as_nanos() / interval.as_nanos()) as u64;
        let mut ticks_skipped = 0u64;

        self.next_tick = Some(match self.config.policy {
            TickPolicy::Skip => {
                ticks_skipped = behind;
                now + interval
            }
            TickPolicy::CatchUp { max_catchup } => {
                ticks_skipped = behind.saturating_sub(max_catchup as u64);
                if behind <= max_catchup as u64 {
                    next + interval
                } else {
                    now + interval
                }
            }
            TickPolicy::Drop => next + interval,
        });

        if overrun {
            warn!(
                tick = self.tick_count + 1,
                late_ms = late_by.as_secs_f64() * 1000.0,
                skipped = ticks_skipped,
                policy = ?self.config.policy,
                "growth tick fired late"
            );
        }
        let tick = self.record_tick(overrun, ticks_skipped);
        TickInfo {
            tick,
            interval,
            overrun,
            ticks_skipped,
        }
    }

    /// Feed frame time into the clock. Returns how many ticks became due.
    ///
    /// Paused or disabled clocks accumulate nothing.
    pub fn advance(&mut self, dt: Duration) -> u32 {
        let Some(interval) = self.interval else {
            return 0;
        };
        if self.paused {
            return 0;
        }

        let mut dt = dt;
        if !self.pending_jitter.is_zero() {
            let absorbed = dt.min(self.pending_jitter);
            self.pending_jitter -= absorbed;
            dt -= absorbed;
        }
        self.accumulated += dt;

        let due = (self.accumulated.as_nanos() / interval.as_nanos()) as u64;
        if due == 0 {
            return 0;
        }

        let (fired, skipped) = match self.config.policy {
            TickPolicy::Skip => {
                self.accumulated = remainder(self.accumulated, interval);
                (1, due - 1)
            }
            TickPolicy::CatchUp { max_catchup } => {
                let fired = due.min(1 + max_catchup as u64);
                self.accumulated = remainder(self.accumulated, interval);
                (fired, due - fired)
            }
            TickPolicy::Drop => {
                self.accumulated -= interval;
                (1, 0)
            }
        };

        let overrun = due > 1;
        for _ in 0..fired {
            self.record_tick(overrun, 0);
        }
        self.metrics.total_skipped += skipped;
        if skipped > 0 {
            warn!(tick = self.tick_count, skipped, "frame delta spanned several growth ticks");
        }
        fired as u32
    }

    fn record_tick(&mut self, overrun: bool, skipped: u64) -> u64 {
        self.tick_count += 1;
        self.metrics.total_ticks += 1;
        self.metrics.total_skipped += skipped;
        if overrun {
            self.metrics.total_overruns += 1;
        }
        trace!(tick = self.tick_count, overrun, "growth tick");
        self.tick_count
    }

    /// Stop firing until [`resume`](Self::resume). Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(tick = self.tick_count, "growth clock paused");
        }
    }

    /// Resume after a pause, with a full interval before the next tick.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            if let Some(interval) = self.interval {
                self.next_tick = Some(Instant::now() + interval);
            }
            self.accumulated = Duration::ZERO;
            debug!(tick = self.tick_count, "growth clock resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Zero interval: the clock never fires.
    pub fn is_disabled(&self) -> bool {
        self.interval.is_none()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn metrics(&self) -> &ClockMetrics {
        &self.metrics
    }
}

fn remainder(total: Duration, interval: Duration) -> Duration {
    let nanos = total.as_nanos() % interval.as_nanos();
    Duration::from_nanos(nanos as u64)
}
