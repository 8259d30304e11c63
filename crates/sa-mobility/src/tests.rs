//! Unit tests for sa-mobility.

use std::future::pending;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sa_core::{Coordinate, TravelProfile, destination_point, distance};
use sa_routing::{RouteProvider, RoutingError, StraightLineRouter};
use tokio::sync::Semaphore;

use crate::{MovementSimulator, SimulatorConfig};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn origin() -> Coordinate {
    Coordinate::new(0.0, 0.0)
}

fn config() -> SimulatorConfig {
    SimulatorConfig { seed: 7, ..SimulatorConfig::default() }
}

fn walker<P: RouteProvider + 'static>(provider: P) -> MovementSimulator<P> {
    MovementSimulator::new(origin(), 1.5, TravelProfile::Walking, provider, config()).unwrap()
}

/// Always fails.
struct DownProvider;

#[async_trait]
impl RouteProvider for DownProvider {
    async fn route(&self, _: Coordinate, _: Coordinate, _: TravelProfile) -> Result<Vec<Coordinate>, RoutingError> {
        Err(RoutingError::Unavailable("offline".into()))
    }
}

/// Answers with no waypoints.
struct EmptyProvider;

#[async_trait]
impl RouteProvider for EmptyProvider {
    async fn route(&self, _: Coordinate, _: Coordinate, _: TravelProfile) -> Result<Vec<Coordinate>, RoutingError> {
        Ok(vec![])
    }
}

/// Never answers.
struct StalledProvider;

#[async_trait]
impl RouteProvider for StalledProvider {
    async fn route(&self, _: Coordinate, _: Coordinate, _: TravelProfile) -> Result<Vec<Coordinate>, RoutingError> {
        pending().await
    }
}

/// Answers with a straight line only after the test releases a permit.
#[derive(Clone)]
struct GatedProvider {
    gate:  Arc<Semaphore>,
    calls: Arc<AtomicUsize>,
}

impl GatedProvider {
    fn new() -> Self {
        Self { gate: Arc::new(Semaphore::new(0)), calls: Arc::new(AtomicUsize::new(0)) }
    }
}

#[async_trait]
impl RouteProvider for GatedProvider {
    async fn route(&self, start: Coordinate, end: Coordinate, _: TravelProfile) -> Result<Vec<Coordinate>, RoutingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let permit = self.gate.acquire().await.map_err(|e| RoutingError::Unavailable(e.to_string()))?;
        permit.forget();
        Ok(vec![start, end])
    }
}

/// Splits the straight line into `segments` equal legs.
struct PolylineProvider {
    segments: usize,
}

#[async_trait]
impl RouteProvider for PolylineProvider {
    async fn route(&self, start: Coordinate, end: Coordinate, _: TravelProfile) -> Result<Vec<Coordinate>, RoutingError> {
        let total = distance(start, end);
        let bearing = start.bearing_to(end);
        Ok((0..=self.segments)
            .map(|i| destination_point(start, bearing, total * i as f64 / self.segments as f64))
            .collect())
    }
}

/// Let spawned route tasks run on the current-thread test runtime.
async fn let_tasks_run() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

// ── Construction ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod construction {
    use sa_core::CoreError;

    use super::*;
    use crate::MobilityError;

    #[tokio::test]
    async fn rejects_non_positive_speed() {
        for speed in [0.0, -1.5, f64::NAN, f64::INFINITY] {
            let result = MovementSimulator::new(origin(), speed, TravelProfile::Walking, StraightLineRouter, config());
            assert!(
                matches!(result, Err(MobilityError::InvalidConfiguration(CoreError::InvalidSpeed(_)))),
                "speed {speed} accepted"
            );
        }
    }

    #[tokio::test]
    async fn rejects_malformed_coordinate() {
        let result = MovementSimulator::new(
            Coordinate::new(10.0, 95.0),
            1.5,
            TravelProfile::Walking,
            StraightLineRouter,
            config(),
        );
        assert!(matches!(
            result,
            Err(MobilityError::InvalidConfiguration(CoreError::InvalidCoordinate { .. }))
        ));
    }

    #[tokio::test]
    async fn rejects_zero_tick_interval() {
        let cfg = SimulatorConfig { tick_interval: Duration::ZERO, ..config() };
        let result = MovementSimulator::new(origin(), 1.5, TravelProfile::Walking, StraightLineRouter, cfg);
        assert!(matches!(result, Err(MobilityError::InvalidConfiguration(_))));
    }

    #[test]
    fn requires_runtime() {
        let result = MovementSimulator::new(origin(), 1.5, TravelProfile::Walking, StraightLineRouter, config());
        assert!(matches!(result, Err(MobilityError::NoRuntime)));
    }

    #[tokio::test]
    async fn starts_idle() {
        let sim = walker(StraightLineRouter);
        assert_eq!(sim.position(), origin());
        assert!(sim.state().route.is_empty());
        assert_eq!(sim.state().route_cursor, 0);
        assert!(!sim.is_route_in_flight());
    }
}

// ── Route following ───────────────────────────────────────────────────────────

#[cfg(test)]
mod following {
    use super::*;
    use crate::WAYPOINT_REACHED_M;

    #[tokio::test]
    async fn first_tick_requests_route_without_moving() {
        let mut sim = walker(StraightLineRouter);
        let pos = sim.tick();
        assert_eq!(pos, origin());
        assert!(sim.is_route_in_flight());

        let dest = sim.state().destination.unwrap();
        let d = distance(origin(), dest);
        assert!((400.0..=800.0).contains(&d), "random destination at {d} m");

        sim.settle().await;
        assert!(!sim.is_route_in_flight());
        assert_eq!(sim.state().route, vec![origin(), dest]);
    }

    #[tokio::test]
    async fn moves_speed_times_interval_per_tick() {
        let mut sim = walker(StraightLineRouter);
        sim.tick();
        sim.settle().await;

        let before = sim.position();
        let after = sim.tick();
        assert!((distance(before, after) - 1.5).abs() < 1e-6);
    }

    #[tokio::test]
    async fn fallback_route_of_100m_exhausts_on_schedule() {
        // Provider down → FallbackRouter answers with the two-point path.
        let router = sa_routing::FallbackRouter::new(DownProvider);
        let mut sim = walker(router);
        let target = destination_point(origin(), 90.0, 100.0);
        sim.set_target(Some(target));

        let mut ticks = 1;
        sim.tick();
        sim.settle().await;
        assert_eq!(sim.state().route.len(), 2);

        while !sim.state().is_route_exhausted() {
            sim.tick();
            ticks += 1;
            assert!(ticks < 200, "never reached the second waypoint");
        }

        let expected = (100.0_f64 / 1.5).floor() as i64;
        assert!((ticks - expected).abs() <= 1, "exhausted after {ticks} ticks");
        assert!(distance(sim.position(), target) < WAYPOINT_REACHED_M);
        assert!(sim.state().pending_target.is_none());
    }

    #[tokio::test]
    async fn cursor_never_exceeds_route_length() {
        let mut sim = MovementSimulator::new(
            origin(),
            13.9,
            TravelProfile::Driving,
            PolylineProvider { segments: 6 },
            config(),
        )
        .unwrap();

        for _ in 0..300 {
            sim.tick();
            let s = sim.state();
            assert!(s.route_cursor <= s.route.len());
            sim.settle().await;
        }
    }

    #[tokio::test]
    async fn driving_speed_does_not_orbit_waypoints() {
        // 13.9 m steps with a 5 m arrival radius: steps are clamped to the
        // remaining distance, so every waypoint is eventually consumed.
        let mut sim = MovementSimulator::new(
            origin(),
            13.9,
            TravelProfile::Driving,
            PolylineProvider { segments: 3 },
            config(),
        )
        .unwrap();
        sim.tick();
        sim.settle().await;
        let len = sim.state().route.len();
        assert_eq!(len, 4);

        let mut ticks = 0;
        while !sim.state().is_route_exhausted() {
            sim.tick();
            ticks += 1;
            assert!(ticks < 200, "stuck at cursor {}", sim.state().route_cursor);
        }
    }
}

// ── Targets ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod targets {
    use super::*;

    #[tokio::test]
    async fn target_without_route_moves_directly() {
        let gated = GatedProvider::new();
        let mut sim = walker(gated.clone());
        let target = destination_point(origin(), 0.0, 300.0);
        sim.set_target(Some(target));

        let p1 = sim.tick();
        assert!((distance(origin(), p1) - 1.5).abs() < 1e-6);
        assert!((distance(p1, target) - 298.5).abs() < 1e-3);
        assert!(sim.is_route_in_flight());
        assert_eq!(sim.state().destination, Some(target));

        // Still no route: keeps moving straight at the target.
        let p2 = sim.tick();
        assert!((distance(p2, target) - 297.0).abs() < 1e-3);
    }

    #[tokio::test]
    async fn target_within_ten_metres_is_cleared() {
        let mut sim = walker(StraightLineRouter);
        sim.set_target(Some(destination_point(origin(), 45.0, 9.0)));
        sim.tick();
        assert!(sim.state().pending_target.is_none());
    }

    #[tokio::test]
    async fn active_route_is_kept_after_retarget() {
        let mut sim = walker(StraightLineRouter);
        sim.tick();
        sim.settle().await;
        let route = sim.state().route.clone();

        sim.set_target(Some(destination_point(origin(), 180.0, 1_000.0)));
        sim.tick();
        assert_eq!(sim.state().route, route, "relaxed convergence: current route continues");
        assert!(!sim.is_route_in_flight());
    }

    #[tokio::test]
    async fn setting_same_target_keeps_generation() {
        let mut sim = walker(StraightLineRouter);
        let target = Some(destination_point(origin(), 10.0, 50.0));
        sim.set_target(target);
        let generation = sim.generation();
        sim.set_target(target);
        assert_eq!(sim.generation(), generation);
        sim.set_target(None);
        assert_eq!(sim.generation(), generation + 1);
    }
}

// ── Provider failures ─────────────────────────────────────────────────────────

#[cfg(test)]
mod failures {
    use super::*;

    #[tokio::test]
    async fn failure_synthesises_fallback_destination() {
        let mut sim = walker(DownProvider);
        sim.tick();
        sim.settle().await;

        let dest = sim.state().destination.unwrap();
        assert!((distance(origin(), dest) - 500.0).abs() < 0.01);
        assert!(sim.state().route.is_empty());

        let p = sim.tick();
        assert!((distance(origin(), p) - 1.5).abs() < 1e-6);
        assert!((distance(p, dest) - 498.5).abs() < 1e-3);
    }

    #[tokio::test]
    async fn fallback_is_deterministic_per_seed() {
        let mut a = walker(DownProvider);
        let mut b = walker(DownProvider);
        for sim in [&mut a, &mut b] {
            sim.tick();
            sim.settle().await;
        }
        assert_eq!(a.state().destination, b.state().destination);
    }

    #[tokio::test]
    async fn empty_route_means_direct_movement() {
        let mut sim = walker(EmptyProvider);
        sim.tick();
        let dest = sim.state().destination.unwrap();
        sim.settle().await;
        assert!(sim.state().route.is_empty());
        assert_eq!(sim.state().destination, Some(dest));

        let p = sim.tick();
        assert!((distance(p, dest) - (distance(origin(), dest) - 1.5)).abs() < 1e-3);
    }

    #[tokio::test]
    async fn stalled_provider_times_out() {
        let cfg = SimulatorConfig { route_timeout: Duration::from_millis(20), ..config() };
        let mut sim = MovementSimulator::new(origin(), 1.5, TravelProfile::Walking, StalledProvider, cfg).unwrap();
        sim.tick();
        assert!(sim.is_route_in_flight());
        sim.settle().await;
        assert!(!sim.is_route_in_flight());
        let dest = sim.state().destination.unwrap();
        assert!((distance(origin(), dest) - 500.0).abs() < 0.01);
    }
}

// ── In-flight guard and staleness ─────────────────────────────────────────────

#[cfg(test)]
mod in_flight {
    use super::*;

    #[tokio::test]
    async fn requests_are_coalesced() {
        let gated = GatedProvider::new();
        let mut sim = walker(gated.clone());
        for _ in 0..5 {
            sim.tick();
            let_tasks_run().await;
        }
        assert_eq!(gated.calls.load(Ordering::SeqCst), 1);
        assert!(sim.is_route_in_flight());
    }

    #[tokio::test]
    async fn ticks_keep_running_while_request_is_outstanding() {
        let gated = GatedProvider::new();
        let mut sim = walker(gated.clone());
        sim.tick();
        let start = sim.position();
        for _ in 0..10 {
            sim.tick();
        }
        assert!((distance(start, sim.position()) - 15.0).abs() < 1e-3);
    }

    #[tokio::test]
    async fn profile_change_discards_stale_response() {
        let gated = GatedProvider::new();
        let mut sim = walker(gated.clone());
        sim.tick();
        assert!(sim.is_route_in_flight());

        sim.set_profile(TravelProfile::Driving);
        assert!(!sim.is_route_in_flight());
        assert_eq!(sim.state().speed_mps, 13.9);
        assert!(sim.state().destination.is_none());

        gated.gate.add_permits(1);
        let_tasks_run().await;
        sim.apply_pending();
        assert!(sim.state().route.is_empty(), "stale route applied");
        assert!(sim.state().destination.is_none());

        sim.tick();
        assert!(sim.is_route_in_flight());
        gated.gate.add_permits(1);
        sim.settle().await;
        assert_eq!(sim.state().route.len(), 2);
        assert_eq!(gated.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn clearing_target_discards_response_for_old_target() {
        let gated = GatedProvider::new();
        let mut sim = walker(gated.clone());
        let target = destination_point(origin(), 270.0, 200.0);
        sim.set_target(Some(target));
        sim.tick();
        assert!(sim.is_route_in_flight());

        sim.set_target(None);
        assert_eq!(sim.state().destination, None);
        gated.gate.add_permits(1);
        let_tasks_run().await;
        sim.apply_pending();
        assert!(sim.state().route.is_empty());

        // The cleared target is no longer pursued: a fresh request goes out
        // and the agent waits for it instead of walking on.
        let before = sim.position();
        assert_eq!(sim.tick(), before);
        assert!(sim.is_route_in_flight());
        let_tasks_run().await;
        assert_eq!(gated.calls.load(Ordering::SeqCst), 2);
        let fresh = sim.state().destination.unwrap();
        assert!(distance(fresh, target) > 1.0);
    }

    #[tokio::test]
    async fn clearing_target_stops_direct_approach() {
        let mut sim = walker(StalledProvider);
        let target = destination_point(origin(), 0.0, 300.0);
        sim.set_target(Some(target));
        sim.tick();
        sim.set_target(None);

        let cleared_at = distance(sim.position(), target);
        sim.tick();
        assert_eq!(distance(sim.position(), target), cleared_at);
        assert_ne!(sim.state().destination, Some(target));
    }

    #[tokio::test]
    async fn profile_change_resets_route_state() {
        let mut sim = walker(StraightLineRouter);
        let target = Some(destination_point(origin(), 0.0, 900.0));
        sim.tick();
        sim.settle().await;
        sim.tick();
        sim.set_target(target);
        assert!(!sim.state().route.is_empty());

        sim.set_profile(TravelProfile::Driving);
        let s = sim.state();
        assert!(s.route.is_empty());
        assert_eq!(s.route_cursor, 0);
        assert!(s.destination.is_none());
        assert_eq!(s.pending_target, target);
        assert_eq!(s.profile, TravelProfile::Driving);
    }
}

// ── Controls ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod controls {
    use sa_core::CoreError;

    use super::*;
    use crate::MobilityError;

    #[tokio::test]
    async fn set_speed_keeps_route_and_changes_step() {
        let mut sim = walker(StraightLineRouter);
        sim.set_target(Some(destination_point(origin(), 0.0, 900.0)));
        sim.tick();
        sim.settle().await;
        let before = sim.tick();
        let route = sim.state().route.clone();

        sim.set_speed(3.0).unwrap();
        let after = sim.tick();
        assert_eq!(sim.state().route, route);
        assert!((distance(before, after) - 3.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn set_speed_rejects_bad_values() {
        let mut sim = walker(StraightLineRouter);
        for speed in [0.0, -2.0, f64::NAN] {
            assert!(matches!(
                sim.set_speed(speed),
                Err(MobilityError::InvalidConfiguration(CoreError::InvalidSpeed(_)))
            ));
        }
        assert_eq!(sim.state().speed_mps, 1.5);
    }

    #[tokio::test]
    async fn initial_route_is_requested_before_first_tick() {
        let gated = GatedProvider::new();
        let mut sim = walker(gated.clone());
        sim.request_initial_route();
        assert!(sim.is_route_in_flight());
        let dest = sim.state().destination.unwrap();
        let_tasks_run().await;
        assert_eq!(gated.calls.load(Ordering::SeqCst), 1);

        // The first tick joins the outstanding request and heads for its
        // destination instead of standing still.
        let p1 = sim.tick();
        let_tasks_run().await;
        assert_eq!(gated.calls.load(Ordering::SeqCst), 1);
        assert!((distance(origin(), p1) - 1.5).abs() < 1e-6);
        assert!(distance(p1, dest) < distance(origin(), dest));

        gated.gate.add_permits(1);
        sim.settle().await;
        assert_eq!(sim.state().route, vec![origin(), dest]);
    }
}
