//! Simulation time model.
//!
//! # Design
//!
//! Time is represented as a monotonically increasing `Tick` counter.  The
//! mapping to wall-clock time is held in `SimClock`:
//!
//!   now = start + tick * tick_duration
//!
//! The movement scheduler advances the clock once per movement tick (1 s by
//! default); the incident engine reads `now()` when it stamps timeline
//! entries and checks dwell time.  Because nothing reads the system clock
//! directly, a test can run an hour of simulated time in microseconds.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

// ── Tick ─────────────────────────────────────────────────────────────────────

/// An absolute simulation tick counter.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    /// Return the tick `n` steps after `self`.
    #[inline]
    pub fn offset(self, n: u64) -> Tick {
        Tick(self.0 + n)
    }

    /// Ticks elapsed from `earlier` to `self` (saturating).
    #[inline]
    pub fn since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl std::ops::Add<u64> for Tick {
    type Output = Tick;
    #[inline]
    fn add(self, rhs: u64) -> Tick {
        Tick(self.0 + rhs)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ── SimClock ──────────────────────────────────────────────────────────────────

/// Converts between tick counts and UTC timestamps.
#[derive(Clone, Debug)]
pub struct SimClock {
    /// Timestamp of tick 0.
    pub start: DateTime<Utc>,
    /// How much simulated time one tick represents.
    pub tick_duration: Duration,
    /// The current tick, advanced by `SimClock::advance()` each iteration.
    pub current_tick: Tick,
}

impl SimClock {
    /// Create a clock starting at `start` with the given resolution.
    pub fn new(start: DateTime<Utc>, tick_duration: Duration) -> Self {
        Self { start, tick_duration, current_tick: Tick::ZERO }
    }

    /// Create a clock starting at the current system time.
    pub fn starting_now(tick_duration: Duration) -> Self {
        Self::new(Utc::now(), tick_duration)
    }

    /// Advance the clock by one tick.
    #[inline]
    pub fn advance(&mut self) {
        self.current_tick = Tick(self.current_tick.0 + 1);
    }

    /// Simulated time elapsed since tick 0.
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.tick_duration.saturating_mul(self.current_tick.0.min(u32::MAX as u64) as u32)
    }

    /// Timestamp corresponding to `current_tick`.
    pub fn now(&self) -> DateTime<Utc> {
        let elapsed = TimeDelta::from_std(self.elapsed()).unwrap_or(TimeDelta::MAX);
        self.start.checked_add_signed(elapsed).unwrap_or(self.start)
    }

    /// Tick duration in fractional seconds.
    #[inline]
    pub fn tick_secs(&self) -> f64 {
        self.tick_duration.as_secs_f64()
    }

    /// How many ticks span `duration`? (rounds up, minimum 1)
    pub fn ticks_for(&self, duration: Duration) -> u64 {
        let tick_ms = self.tick_duration.as_millis().max(1);
        (duration.as_millis().div_ceil(tick_ms) as u64).max(1)
    }
}

impl fmt::Display for SimClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.current_tick, self.now().format("%H:%M:%S"))
    }
}
