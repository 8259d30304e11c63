//! Fluent builder for constructing a [`Session`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sa_core::{SimClock, SimRng};
use sa_incident::{EventFeed, IncidentEngine, SimulatedFeed};
use sa_mobility::MovementSimulator;
use sa_routing::RouteProvider;
use tokio::sync::{mpsc, watch};

use crate::{Session, SessionConfig, SessionResult};

/// Seed offsets for the session's independent random streams.
const LIFECYCLE_STREAM: u64 = 1;
const GENERATOR_STREAM: u64 = 2;

/// Fluent builder for [`Session<P>`].
///
/// # Required inputs
///
/// - [`SessionConfig`] — position, profile, intervals, seed, …
/// - `P: RouteProvider` — e.g. `config.route_provider()`
///
/// # Optional inputs (have defaults)
///
/// | Method            | Default                          |
/// |-------------------|----------------------------------|
/// | `.feed(f)`        | none: incidents are simulated    |
/// | `.start_time(t)`  | `Utc::now()`                     |
///
/// # Example
///
/// ```rust,ignore
/// let provider = config.route_provider();
/// let mut session = SessionBuilder::new(config, provider)
///     .start_time(t0)
///     .build()?;
/// session.run_ticks(60, &mut NoopObserver).await;
/// ```
pub struct SessionBuilder<P: RouteProvider + 'static> {
    config:     SessionConfig,
    provider:   P,
    feed:       Option<Arc<dyn EventFeed>>,
    start_time: Option<DateTime<Utc>>,
}

impl<P: RouteProvider + 'static> SessionBuilder<P> {
    pub fn new(config: SessionConfig, provider: P) -> Self {
        Self { config, provider, feed: None, start_time: None }
    }

    /// Query `feed` for the initial incidents instead of simulating them.
    pub fn feed(mut self, feed: Arc<dyn EventFeed>) -> Self {
        self.feed = Some(feed);
        self
    }

    /// Simulated wall-clock time of tick 0.
    pub fn start_time(mut self, start: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self
    }

    /// Validate the configuration, place seed incidents, start the first
    /// route request, and return a session at tick 0.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn build(self) -> SessionResult<Session<P>> {
        let config = self.config;
        config.validate()?;

        let initial = config.initial_coordinate()?;
        let mut simulator = MovementSimulator::new(
            initial,
            config.speed(),
            config.profile,
            self.provider,
            config.simulator_config(),
        )?;
        simulator.set_target(config.target_coordinate()?);
        simulator.request_initial_route();

        let clock = match self.start_time {
            Some(start) => SimClock::new(start, config.movement_interval()),
            None => SimClock::starting_now(config.movement_interval()),
        };

        let mut engine = IncidentEngine::new(config.engine_config());
        engine.observe(initial);
        for record in config.seed_incidents.iter().cloned() {
            let incident = record.into_incident(initial, clock.now())?;
            engine.insert(incident);
        }

        let mut root = SimRng::new(config.seed);
        let rng = root.child(LIFECYCLE_STREAM);
        let simulated = SimulatedFeed::new(config.seed.wrapping_add(GENERATOR_STREAM));

        let (feed_tx, feed_rx) = mpsc::unbounded_channel();
        let incident_interval = config.incident_interval();
        let incident_every = clock.ticks_for(incident_interval);
        let last_level = engine.assess().level;

        let session = Session {
            simulator,
            engine,
            rng,
            feed: self.feed.or_else(|| config.event_feed()),
            simulated,
            feed_radius_m: config.feed_radius_m,
            feed_timeout: Duration::from_millis(config.route_timeout_ms),
            feed_loaded: false,
            feed_tx,
            feed_rx,
            incident_interval,
            incident_every,
            last_level,
            snapshot_tx: watch::channel(placeholder_snapshot(&clock, initial)).0,
            clock,
        };
        session.snapshot_tx.send_replace(session.snapshot());

        log::info!(
            "session built at {initial} ({}, {:.1} m/s, {} seed incidents)",
            config.profile,
            config.speed(),
            session.engine.len()
        );
        Ok(session)
    }
}

/// Stand-in until the session exists and can snapshot itself.
fn placeholder_snapshot(clock: &SimClock, position: sa_core::Coordinate) -> crate::SessionSnapshot {
    crate::SessionSnapshot {
        tick:            0,
        time:            clock.now(),
        position,
        profile:         Default::default(),
        target:          None,
        route_remaining: 0,
        incidents:       Vec::new(),
        safety:          sa_incident::assess(std::iter::empty::<&sa_incident::Incident>()),
        summary:         Default::default(),
    }
}
