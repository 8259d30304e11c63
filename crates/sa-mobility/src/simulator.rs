//! `MovementSimulator` — advances one agent per tick and keeps it routed.

use std::sync::Arc;
use std::time::Duration;

use sa_core::{
    AgentId, AgentRng, Coordinate, CoreError, RandomSource, TravelProfile, destination_point,
    distance, move_towards,
};
use sa_routing::{RouteProvider, RoutingError};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::{MobilityError, MobilityResult, MovementState};

/// A waypoint closer than this counts as reached.
pub const WAYPOINT_REACHED_M: f64 = 5.0;

/// A pending target or destination closer than this counts as reached.
pub const TARGET_REACHED_M: f64 = 10.0;

// ── SimulatorConfig ───────────────────────────────────────────────────────────

/// Tunables for a [`MovementSimulator`].
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Identity of the simulated agent (mixed into the RNG seed).
    pub agent: AgentId,

    /// Global seed for random destinations and fallback bearings.
    pub seed: u64,

    /// Simulated time covered by one tick.  Default: 1 s.
    pub tick_interval: Duration,

    /// Upper bound on a single provider call.  Default: 10 s.
    pub route_timeout: Duration,

    /// Random destinations are drawn this far from the agent (metres).
    /// Default: 400–800 m.
    pub random_destination_min_m: f64,
    pub random_destination_max_m: f64,

    /// Distance of the synthetic destination used when the provider fails.
    /// Default: 500 m.
    pub fallback_offset_m: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            agent:                    AgentId(0),
            seed:                     0,
            tick_interval:            Duration::from_secs(1),
            route_timeout:            Duration::from_secs(10),
            random_destination_min_m: 400.0,
            random_destination_max_m: 800.0,
            fallback_offset_m:        500.0,
        }
    }
}

// ── Route responses ───────────────────────────────────────────────────────────

/// Completion message sent by a route task back to its simulator.
#[derive(Debug)]
struct RouteResponse {
    /// Context generation at the time the request was issued.
    generation:  u64,
    destination: Coordinate,
    result:      Result<Vec<Coordinate>, RoutingError>,
}

// ── MovementSimulator ─────────────────────────────────────────────────────────

/// Owns one agent's [`MovementState`] and advances it once per [`tick`].
///
/// Route requests are spawned on the Tokio runtime that was current when the
/// simulator was created; their results come back over a channel and are
/// applied at the start of the next tick.  At most one request is in flight
/// per context; further requests while one is outstanding are coalesced
/// into it.
///
/// [`tick`]: MovementSimulator::tick
pub struct MovementSimulator<P: RouteProvider + 'static> {
    state:      MovementState,
    config:     SimulatorConfig,
    provider:   Arc<P>,
    rng:        AgentRng,
    runtime:    Handle,
    /// Bumped whenever the travel context changes; stale responses carry an
    /// older value.
    generation: u64,
    in_flight:  bool,
    tx:         mpsc::UnboundedSender<RouteResponse>,
    rx:         mpsc::UnboundedReceiver<RouteResponse>,
}

impl<P: RouteProvider + 'static> MovementSimulator<P> {
    /// Create a simulator at `initial`, moving at `speed_mps`.
    ///
    /// # Errors
    ///
    /// - [`MobilityError::InvalidConfiguration`] for a malformed coordinate,
    ///   a non-positive or non-finite speed, or a zero tick interval.
    /// - [`MobilityError::NoRuntime`] when called outside a Tokio runtime.
    pub fn new(
        initial:   Coordinate,
        speed_mps: f64,
        profile:   TravelProfile,
        provider:  P,
        config:    SimulatorConfig,
    ) -> MobilityResult<Self> {
        let initial = Coordinate::try_new(initial.lon, initial.lat)?;
        validate_speed(speed_mps)?;
        if config.tick_interval.is_zero() {
            return Err(CoreError::Config("tick interval must be non-zero".into()).into());
        }
        if !(config.random_destination_min_m <= config.random_destination_max_m) {
            return Err(CoreError::Config("random destination range is inverted".into()).into());
        }
        let runtime = Handle::try_current().map_err(|_| MobilityError::NoRuntime)?;
        let (tx, rx) = mpsc::unbounded_channel();

        Ok(Self {
            state:      MovementState::new(initial, speed_mps, profile),
            rng:        AgentRng::new(config.seed, config.agent),
            config,
            provider:   Arc::new(provider),
            runtime,
            generation: 0,
            in_flight:  false,
            tx,
            rx,
        })
    }

    // ── Read API ──────────────────────────────────────────────────────────

    #[inline]
    pub fn position(&self) -> Coordinate {
        self.state.current_position
    }

    #[inline]
    pub fn state(&self) -> &MovementState {
        &self.state
    }

    #[inline]
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    #[inline]
    pub fn profile(&self) -> TravelProfile {
        self.state.profile
    }

    /// `true` while a route request for the current context is outstanding.
    #[inline]
    pub fn is_route_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Current context generation.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    // ── Write API ─────────────────────────────────────────────────────────

    /// Set or clear the user target.
    ///
    /// Any change invalidates the outstanding route request: its response
    /// would be for the old target.  The current route is kept, so the agent
    /// finishes it before heading for the new target.  Without a route, a
    /// destination that was the old target is dropped so the next tick
    /// requests a fresh one.
    pub fn set_target(&mut self, target: Option<Coordinate>) {
        if self.state.pending_target == target {
            return;
        }
        log::debug!("target {:?} -> {:?}", self.state.pending_target, target);
        let previous = std::mem::replace(&mut self.state.pending_target, target);
        if previous.is_some() && previous == self.state.destination && !self.state.has_active_route() {
            self.state.destination = None;
        }
        self.invalidate();
    }

    /// Switch travel profile.
    ///
    /// The movement state is replaced wholesale: route and cursor reset,
    /// destination cleared, speed set to the profile default.  The position
    /// and pending target carry over.
    pub fn set_profile(&mut self, profile: TravelProfile) {
        let mut next = MovementState::new(
            self.state.current_position,
            profile.default_speed_mps(),
            profile,
        );
        next.pending_target = self.state.pending_target;
        self.state = next;
        self.invalidate();
        log::info!("profile set to {profile}; route reset");
    }

    /// Change speed without touching the route.
    ///
    /// # Errors
    ///
    /// [`MobilityError::InvalidConfiguration`] for non-positive or
    /// non-finite speeds.
    pub fn set_speed(&mut self, speed_mps: f64) -> MobilityResult<()> {
        validate_speed(speed_mps)?;
        self.state.speed_mps = speed_mps;
        Ok(())
    }

    /// Kick off the first route request without moving.
    ///
    /// Optional: the first `tick` requests a route anyway.
    pub fn request_initial_route(&mut self) {
        self.request_route(self.state.pending_target);
    }

    // ── Tick ──────────────────────────────────────────────────────────────

    /// Advance one tick and return the new position.
    pub fn tick(&mut self) -> Coordinate {
        self.apply_pending();

        let pos  = self.state.current_position;
        let step = self.state.speed_mps * self.config.tick_interval.as_secs_f64();

        // ① Pending target takes priority while no route is active.
        if let Some(target) = self.state.pending_target {
            if distance(pos, target) < TARGET_REACHED_M {
                log::info!("reached target {target}");
                self.state.pending_target = None;
            } else if !self.state.has_active_route() {
                self.request_route(Some(target));
                return self.move_to(move_towards(pos, target, step));
            }
            // With a route active, keep following it; the target is picked
            // up once the route runs out.
        }

        // ② Route following.
        if let Some(waypoint) = self.state.current_waypoint() {
            if distance(pos, waypoint) < WAYPOINT_REACHED_M {
                self.state.route_cursor += 1;
            }
            let Some(next) = self.state.current_waypoint() else {
                log::debug!("route exhausted at {pos}");
                self.request_route(self.state.pending_target);
                return pos;
            };
            return self.move_to(move_towards(pos, next, step));
        }

        // ③/④ No usable route: head straight for the destination, if any.
        match self.state.destination {
            None => {
                self.request_route(self.state.pending_target);
                pos
            }
            Some(dest) if distance(pos, dest) < TARGET_REACHED_M => {
                self.request_route(self.state.pending_target);
                pos
            }
            Some(dest) => self.move_to(move_towards(pos, dest, step)),
        }
    }

    /// Apply every route response that has already arrived.
    pub fn apply_pending(&mut self) {
        while let Ok(resp) = self.rx.try_recv() {
            self.apply_response(resp);
        }
    }

    /// Wait until no route request is in flight, applying responses as they
    /// arrive.
    ///
    /// Provider calls are bounded by `route_timeout`, so this always
    /// completes.
    pub async fn settle(&mut self) {
        while self.in_flight {
            match self.rx.recv().await {
                Some(resp) => self.apply_response(resp),
                None => break,
            }
        }
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn move_to(&mut self, next: Coordinate) -> Coordinate {
        self.state.current_position = next;
        next
    }

    fn invalidate(&mut self) {
        self.generation += 1;
        self.in_flight = false;
    }

    fn random_destination(&mut self, origin: Coordinate) -> Coordinate {
        let d = self
            .rng
            .between(self.config.random_destination_min_m, self.config.random_destination_max_m);
        let bearing = self.rng.between(0.0, 360.0);
        destination_point(origin, bearing, d)
    }

    /// Issue a route request towards `target` (or a random destination).
    /// No-op while another request for this context is in flight.
    fn request_route(&mut self, target: Option<Coordinate>) {
        if self.in_flight {
            return;
        }
        let origin = self.state.current_position;
        let destination = match target {
            Some(t) => t,
            None => self.random_destination(origin),
        };
        self.state.destination = Some(destination);
        self.in_flight = true;

        let generation = self.generation;
        let provider   = Arc::clone(&self.provider);
        let profile    = self.state.profile;
        let timeout    = self.config.route_timeout;
        let tx         = self.tx.clone();

        log::debug!("requesting {profile} route {origin} -> {destination} (gen {generation})");
        self.runtime.spawn(async move {
            let result = match tokio::time::timeout(timeout, provider.route(origin, destination, profile)).await {
                Ok(result) => result,
                Err(_) => Err(RoutingError::Timeout(timeout.as_millis() as u64)),
            };
            // The simulator may have been dropped meanwhile; nothing to do then.
            let _ = tx.send(RouteResponse { generation, destination, result });
        });
    }

    fn apply_response(&mut self, resp: RouteResponse) {
        if resp.generation != self.generation {
            log::debug!(
                "discarding stale route response (gen {} != {})",
                resp.generation,
                self.generation
            );
            return;
        }
        self.in_flight = false;

        match resp.result {
            Ok(route) if !route.is_empty() => {
                log::info!("route to {} installed ({} waypoints)", resp.destination, route.len());
                self.state.install_route(route);
            }
            Ok(_) => {
                // Direct movement towards `destination` takes over.
                log::debug!("provider returned an empty route to {}", resp.destination);
                self.state.clear_route();
            }
            Err(e) => {
                let pos = self.state.current_position;
                let bearing = self.rng.between(0.0, 360.0);
                let fallback = destination_point(pos, bearing, self.config.fallback_offset_m);
                log::warn!("route request failed ({e}); heading for fallback {fallback}");
                self.state.clear_route();
                self.state.destination = Some(fallback);
            }
        }
    }
}

fn validate_speed(speed_mps: f64) -> Result<(), CoreError> {
    if speed_mps.is_finite() && speed_mps > 0.0 {
        Ok(())
    } else {
        Err(CoreError::InvalidSpeed(speed_mps))
    }
}
