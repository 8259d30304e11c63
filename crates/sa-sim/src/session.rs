//! The `Session` struct, its schedulers, and its read/write API.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sa_core::{Coordinate, IncidentId, SimClock, SimRng, Tick, TravelProfile};
use sa_incident::{
    EventFeed, FeedError, FeedRecord, Incident, IncidentEngine, IncidentFilter, IncidentStatus,
    IncidentSummary, SafetyAssessment, SafetyLevel, Severity, SimulatedFeed,
};
use sa_mobility::MovementSimulator;
use sa_routing::RouteProvider;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use crate::{SessionObserver, SessionResult};

// ── Snapshot and commands ─────────────────────────────────────────────────────

/// Everything a consumer renders, published after every change.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub tick:      u64,
    pub time:      DateTime<Utc>,
    pub position:  Coordinate,
    pub profile:   TravelProfile,
    pub target:    Option<Coordinate>,
    /// Waypoints still ahead on the active route.
    pub route_remaining: usize,
    /// Every incident, resolved included, with live distances.
    pub incidents: Vec<Incident>,
    pub safety:    SafetyAssessment,
    pub summary:   IncidentSummary,
}

/// Operator and user actions accepted by [`Session::run`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    SetTarget(Option<Coordinate>),
    SetProfile(TravelProfile),
    /// Metres per second; the route is kept.
    SetSpeed(f64),
    OverrideStatus(IncidentId, IncidentStatus),
    OverrideSeverity(IncidentId, Severity),
    AddNote(IncidentId, String),
    Shutdown,
}

type FeedResponse = Result<Vec<FeedRecord>, FeedError>;

// ── Session ───────────────────────────────────────────────────────────────────

/// One agent, its incident population, and the schedulers that drive them.
///
/// All mutation happens through `&mut self`; route and feed fetches run as
/// spawned tasks whose results are applied on the next step.
///
/// Create via [`SessionBuilder`][crate::SessionBuilder].
pub struct Session<P: RouteProvider + 'static> {
    pub(crate) simulator: MovementSimulator<P>,
    pub(crate) engine:    IncidentEngine,
    pub(crate) clock:     SimClock,

    /// Drives the incident lifecycle; independent of the movement RNG.
    pub(crate) rng: SimRng,

    pub(crate) feed:          Option<Arc<dyn EventFeed>>,
    pub(crate) simulated:     SimulatedFeed,
    pub(crate) feed_radius_m: f64,
    pub(crate) feed_timeout:  Duration,
    pub(crate) feed_loaded:   bool,
    pub(crate) feed_tx:       mpsc::UnboundedSender<FeedResponse>,
    pub(crate) feed_rx:       mpsc::UnboundedReceiver<FeedResponse>,

    pub(crate) incident_interval: Duration,
    /// Movement ticks per incident tick in [`Session::step`].
    pub(crate) incident_every:    u64,

    pub(crate) last_level:  SafetyLevel,
    pub(crate) snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl<P: RouteProvider + 'static> Session<P> {
    // ── Read API ──────────────────────────────────────────────────────────

    #[inline]
    pub fn position(&self) -> Coordinate {
        self.simulator.position()
    }

    #[inline]
    pub fn simulator(&self) -> &MovementSimulator<P> {
        &self.simulator
    }

    #[inline]
    pub fn engine(&self) -> &IncidentEngine {
        &self.engine
    }

    #[inline]
    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    #[inline]
    pub fn current_tick(&self) -> Tick {
        self.clock.current_tick
    }

    /// Every incident with its distance to the current position.
    #[inline]
    pub fn incidents(&self) -> &[Incident] {
        self.engine.incidents()
    }

    pub fn filter(&self, filter: &IncidentFilter) -> Vec<&Incident> {
        self.engine.filter(filter)
    }

    pub fn assessment(&self) -> SafetyAssessment {
        self.engine.assess()
    }

    /// Build a snapshot of the current state.
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.simulator.state();
        SessionSnapshot {
            tick:            self.clock.current_tick.0,
            time:            self.clock.now(),
            position:        state.current_position,
            profile:         state.profile,
            target:          state.pending_target,
            route_remaining: state.remaining_waypoints().len(),
            incidents:       self.engine.incidents().to_vec(),
            safety:          self.engine.assess(),
            summary:         self.engine.summary(),
        }
    }

    /// Receiver that always holds the most recently published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    // ── Write API ─────────────────────────────────────────────────────────

    pub fn set_target(&mut self, target: Option<Coordinate>) {
        self.simulator.set_target(target);
    }

    pub fn set_profile(&mut self, profile: TravelProfile) {
        self.simulator.set_profile(profile);
    }

    /// # Errors
    ///
    /// [`MobilityError::InvalidConfiguration`][sa_mobility::MobilityError::InvalidConfiguration]
    /// for a non-positive or non-finite speed.
    pub fn set_speed(&mut self, speed_mps: f64) -> SessionResult<()> {
        self.simulator.set_speed(speed_mps)?;
        Ok(())
    }

    /// # Errors
    ///
    /// [`IncidentError::NotFound`][sa_incident::IncidentError::NotFound]
    /// for an unknown id.
    pub fn override_status(&mut self, id: &IncidentId, status: IncidentStatus) -> SessionResult<()> {
        self.engine.override_status(id, status, self.clock.now())?;
        Ok(())
    }

    /// # Errors
    ///
    /// [`IncidentError::NotFound`][sa_incident::IncidentError::NotFound]
    /// for an unknown id.
    pub fn override_severity(&mut self, id: &IncidentId, severity: Severity) -> SessionResult<()> {
        self.engine.override_severity(id, severity, self.clock.now())?;
        Ok(())
    }

    /// # Errors
    ///
    /// Unknown id or blank note.
    pub fn add_note(&mut self, id: &IncidentId, text: &str) -> SessionResult<()> {
        self.engine.add_note(id, text, self.clock.now())?;
        Ok(())
    }

    /// Apply one [`SessionCommand`].  `Shutdown` is a no-op here.
    pub fn apply_command(&mut self, command: SessionCommand) -> SessionResult<()> {
        match command {
            SessionCommand::SetTarget(target) => self.set_target(target),
            SessionCommand::SetProfile(profile) => self.set_profile(profile),
            SessionCommand::SetSpeed(speed) => self.set_speed(speed)?,
            SessionCommand::OverrideStatus(id, status) => self.override_status(&id, status)?,
            SessionCommand::OverrideSeverity(id, severity) => self.override_severity(&id, severity)?,
            SessionCommand::AddNote(id, text) => self.add_note(&id, &text)?,
            SessionCommand::Shutdown => {}
        }
        Ok(())
    }

    // ── Incident loading ──────────────────────────────────────────────────

    /// Fetch the initial incident population and wait for it.
    ///
    /// Queries the configured feed (bounded by the route timeout); on error,
    /// timeout, or an empty answer falls back to simulated incidents.
    /// Without a feed, incidents are simulated directly.
    pub async fn load_incidents(&mut self) {
        let response = match &self.feed {
            Some(feed) => {
                let center = self.position();
                match tokio::time::timeout(self.feed_timeout, feed.fetch_near(center, self.feed_radius_m)).await {
                    Ok(result) => result,
                    Err(_) => Err(FeedError::Unavailable("feed request timed out".into())),
                }
            }
            None => Ok(Vec::new()),
        };
        self.apply_feed_response(response);
    }

    /// Start the initial fetch without waiting; the result is applied by
    /// the next step.
    fn spawn_incident_load(&mut self) {
        let Some(feed) = self.feed.clone() else {
            self.apply_feed_response(Ok(Vec::new()));
            return;
        };
        let tx = self.feed_tx.clone();
        let center = self.position();
        let radius = self.feed_radius_m;
        let timeout = self.feed_timeout;
        tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, feed.fetch_near(center, radius)).await {
                Ok(result) => result,
                Err(_) => Err(FeedError::Unavailable("feed request timed out".into())),
            };
            let _ = tx.send(result);
        });
    }

    fn apply_pending_feed(&mut self) {
        while let Ok(response) = self.feed_rx.try_recv() {
            self.apply_feed_response(response);
        }
    }

    fn apply_feed_response(&mut self, response: FeedResponse) {
        let first_load = !self.feed_loaded;
        self.feed_loaded = true;

        let records = match response {
            Ok(records) => records,
            Err(e) => {
                log::warn!("event feed failed: {e}");
                Vec::new()
            }
        };

        if records.is_empty() && first_load {
            log::info!("no feed incidents; generating simulated incidents");
            let generated = self.simulated.generate(self.position(), self.feed_radius_m, self.clock.now());
            self.merge_records(generated);
        } else {
            self.merge_records(records);
        }
    }

    fn merge_records(&mut self, records: Vec<FeedRecord>) {
        let center = self.position();
        let now = self.clock.now();
        let incidents = records.into_iter().filter_map(|r| match r.into_incident(center, now) {
            Ok(incident) => Some(incident),
            Err(e) => {
                log::warn!("skipping feed record: {e}");
                None
            }
        });
        self.engine.merge(incidents.collect::<Vec<_>>());
    }

    // ── Stepping ──────────────────────────────────────────────────────────

    /// Advance one movement tick, plus an incident tick whenever the tick
    /// count reaches a multiple of the incident interval.
    pub fn step(&mut self) -> Coordinate {
        self.step_with(&mut crate::NoopObserver)
    }

    pub fn step_with<O: SessionObserver>(&mut self, observer: &mut O) -> Coordinate {
        let position = self.move_once(observer);
        if self.clock.current_tick.0.is_multiple_of(self.incident_every) {
            self.incident_tick(observer);
        }
        self.publish(observer);
        position
    }

    /// Wait for any outstanding route request.
    pub async fn settle(&mut self) {
        self.simulator.settle().await;
    }

    /// Step `n` times, settling routes between steps.  Loads incidents
    /// first if that has not happened yet.
    pub async fn run_ticks<O: SessionObserver>(&mut self, n: u64, observer: &mut O) {
        if !self.feed_loaded {
            self.load_incidents().await;
        }
        for _ in 0..n {
            self.step_with(observer);
            self.settle().await;
        }
        observer.on_session_end(self.clock.current_tick);
    }

    /// Drive the session in real time until `commands` closes or a
    /// [`SessionCommand::Shutdown`] arrives.
    ///
    /// Movement and incident ticks come from two independent intervals.
    pub async fn run<O: SessionObserver>(
        &mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
        observer:     &mut O,
    ) {
        let mut movement = tokio::time::interval(self.clock.tick_duration);
        movement.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut incidents = tokio::time::interval(self.incident_interval);
        incidents.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // The first tick of an interval completes immediately.
        incidents.tick().await;
        if !self.feed_loaded {
            self.spawn_incident_load();
        }
        log::info!("session running from {}", self.position());

        loop {
            tokio::select! {
                _ = movement.tick() => {
                    self.move_once(observer);
                    self.publish(observer);
                }
                _ = incidents.tick() => {
                    self.incident_tick(observer);
                    self.publish(observer);
                }
                Some(response) = self.feed_rx.recv() => {
                    self.apply_feed_response(response);
                    self.publish(observer);
                }
                command = commands.recv() => match command {
                    None | Some(SessionCommand::Shutdown) => break,
                    Some(command) => {
                        if let Err(e) = self.apply_command(command) {
                            log::warn!("command rejected: {e}");
                        }
                        self.publish(observer);
                    }
                },
            }
        }

        log::info!("session stopped at {}", self.clock.current_tick);
        observer.on_session_end(self.clock.current_tick);
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn move_once<O: SessionObserver>(&mut self, observer: &mut O) -> Coordinate {
        self.apply_pending_feed();
        self.clock.advance();
        let position = self.simulator.tick();
        self.engine.observe(position);
        observer.on_move(self.clock.current_tick, position);
        position
    }

    fn incident_tick<O: SessionObserver>(&mut self, observer: &mut O) {
        let changed = self.engine.tick(self.clock.now(), &mut self.rng);
        log::debug!("incident tick at {}: {} changed", self.clock.current_tick, changed.len());
        observer.on_incidents(self.clock.current_tick, &changed);
    }

    fn publish<O: SessionObserver>(&mut self, observer: &mut O) {
        let snapshot = self.snapshot();
        if snapshot.safety.level != self.last_level {
            log::info!("safety {} -> {}: {}", self.last_level, snapshot.safety.level, snapshot.safety.detail);
            self.last_level = snapshot.safety.level;
            observer.on_safety_change(self.clock.current_tick, &snapshot.safety);
        }
        self.snapshot_tx.send_replace(snapshot);
    }
}
