//! Dual-cadence polling state machine.
//!
//! ```text
//! Idle --launch--> Slow --popover opened--> Fast { until }
//!                   ^                          |
//!                   +-- window expiry / close --+
//! ```
//!
//! Time only enters through the `Clock`, so the whole machine can be driven
//! from a `ManualClock` in tests.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::clock::Clock;

/// Fallback delay when an interval does not fit after the current instant
const MAX_DELAY: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Poll intervals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    /// Interval while the usage panel is closed
    pub slow: Duration,
    /// Interval while the usage panel is open
    pub fast: Duration,
    /// Longest continuous stretch of fast polling
    pub fast_window: Duration,
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            slow: Duration::from_secs(300),
            fast: Duration::from_secs(30),
            fast_window: Duration::from_secs(300),
        }
    }
}

/// Current polling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollMode {
    /// Not launched yet
    Idle,
    SlowPolling,
    /// Fast cadence until the window closes at `until`
    FastPolling { until: Instant },
}

impl PollMode {
    pub fn is_fast(&self) -> bool {
        matches!(self, PollMode::FastPolling { .. })
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PollMode::Idle => "idle",
            PollMode::SlowPolling => "slow",
            PollMode::FastPolling { .. } => "fast",
        }
    }
}

/// Scheduler decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Start a fetch now
    FetchNow,
    /// Nothing to do until `next_deadline`
    Wait,
}

/// Decides when fetches happen.
///
/// Exactly one deadline is armed at a time; entering a mode replaces the
/// previous mode's deadline. While paused (launched without credentials)
/// deadlines keep advancing but every tick is `Wait`.
pub struct PollScheduler<C: Clock> {
    clock: C,
    cadence: Cadence,
    mode: PollMode,
    next_fetch: Option<Instant>,
    paused: bool,
}

impl<C: Clock> PollScheduler<C> {
    pub fn new(clock: C, cadence: Cadence) -> Self {
        Self {
            clock,
            cadence,
            mode: PollMode::Idle,
            next_fetch: None,
            paused: false,
        }
    }

    pub fn mode(&self) -> PollMode {
        self.mode
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Start slow polling; fetch immediately only when credentials exist
    pub fn launch(&mut self, has_credentials: bool) -> Tick {
        let now = self.clock.now();
        self.paused = !has_credentials;
        self.enter_slow(now);
        if self.paused {
            info!("No credentials stored; polling paused until setup completes");
        }
        self.gate()
    }

    /// Fetch now and poll fast for one window, restarting any current window
    pub fn popover_opened(&mut self) -> Tick {
        let now = self.clock.now();
        let until = later(now, self.cadence.fast_window);
        self.mode = PollMode::FastPolling { until };
        self.next_fetch = Some(later(now, self.cadence.fast));
        info!(
            "Fast polling every {:?} for {:?}",
            self.cadence.fast, self.cadence.fast_window
        );
        self.gate()
    }

    /// Drop back to slow cadence; no-op unless polling fast
    pub fn popover_closed(&mut self) {
        if self.mode.is_fast() {
            let now = self.clock.now();
            self.enter_slow(now);
            info!("Popover closed; back to slow polling");
        }
    }

    /// Unpause and fetch immediately
    pub fn credentials_saved(&mut self) -> Tick {
        self.paused = false;
        if self.mode == PollMode::Idle {
            let now = self.clock.now();
            self.enter_slow(now);
        }
        Tick::FetchNow
    }

    /// User-requested refresh; leaves the timers alone
    pub fn manual_refresh(&self) -> Tick {
        self.gate()
    }

    /// Fire whatever is due at the current time.
    ///
    /// Fast-window expiry is handled before a fast tick due at the same
    /// instant, and the first slow tick after expiry is one slow interval
    /// after the window closed.
    pub fn poll(&mut self) -> Tick {
        let now = self.clock.now();

        if let PollMode::FastPolling { until } = self.mode {
            if now >= until {
                self.mode = PollMode::SlowPolling;
                self.next_fetch = Some(later(until, self.cadence.slow));
                info!("Fast polling window elapsed; back to slow polling");
            }
        }

        match self.next_fetch {
            Some(due) if now >= due => {
                self.next_fetch = Some(later(now, self.interval()));
                debug!("Poll tick ({} cadence)", self.mode.display_name());
                self.gate()
            }
            _ => Tick::Wait,
        }
    }

    /// Earliest instant at which `poll` may have work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.mode, self.next_fetch) {
            (PollMode::FastPolling { until }, Some(due)) => Some(due.min(until)),
            (PollMode::FastPolling { until }, None) => Some(until),
            (_, next) => next,
        }
    }

    fn interval(&self) -> Duration {
        if self.mode.is_fast() {
            self.cadence.fast
        } else {
            self.cadence.slow
        }
    }

    fn enter_slow(&mut self, now: Instant) {
        self.mode = PollMode::SlowPolling;
        self.next_fetch = Some(later(now, self.cadence.slow));
    }

    fn gate(&self) -> Tick {
        if self.paused {
            Tick::Wait
        } else {
            Tick::FetchNow
        }
    }
}

/// `at + by`, saturating at the furthest representable instant
fn later(at: Instant, by: Duration) -> Instant {
    at.checked_add(by)
        .or_else(|| at.checked_add(MAX_DELAY))
        .unwrap_or(at)
}
