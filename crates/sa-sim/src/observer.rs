//! Session observer trait for progress reporting.

use sa_core::{Coordinate, IncidentId, Tick};
use sa_incident::SafetyAssessment;

/// Callbacks invoked by the session as it advances.
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.
///
/// # Example — position logger
///
/// ```rust,ignore
/// struct Trail(Vec<Coordinate>);
///
/// impl SessionObserver for Trail {
///     fn on_move(&mut self, _tick: Tick, position: Coordinate) {
///         self.0.push(position);
///     }
/// }
/// ```
pub trait SessionObserver {
    /// Called after every movement tick with the agent's new position.
    fn on_move(&mut self, _tick: Tick, _position: Coordinate) {}

    /// Called after every incident tick with the incidents whose status or
    /// severity changed.
    fn on_incidents(&mut self, _tick: Tick, _changed: &[IncidentId]) {}

    /// Called whenever the safety level differs from the previous one.
    fn on_safety_change(&mut self, _tick: Tick, _assessment: &SafetyAssessment) {}

    /// Called once when `run` or `run_ticks` returns.
    fn on_session_end(&mut self, _final_tick: Tick) {}
}

/// A [`SessionObserver`] that does nothing.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}
