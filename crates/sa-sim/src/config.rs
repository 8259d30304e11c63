//! Session configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file is a valid configuration:
//!
//! ```toml
//! initial_position     = [-122.4194, 37.7749]
//! profile              = "walking"
//! movement_interval_ms = 1000
//! incident_interval_secs = 30
//! seed                 = 42
//!
//! [[seed_incidents]]
//! id       = "fixed-incident-1"
//! category = "emergency"
//! severity = "critical"
//! status   = "in_progress"
//! location = [-122.41945, 37.77495]
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use sa_core::{AgentId, Coordinate, CoreError, TravelProfile};
use sa_incident::{DEFAULT_FEED_RADIUS_M, EngineConfig, EventFeed, FeedRecord, JsonFeed};
use sa_mobility::SimulatorConfig;
use sa_routing::{FallbackRouter, MapboxRouter, RouteProvider, StraightLineRouter};
use serde::{Deserialize, Serialize};

use crate::{SessionError, SessionResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Where the agent starts, `[lng, lat]`.
    pub initial_position: [f64; 2],

    pub profile: TravelProfile,

    /// Overrides the profile's default speed (m/s).
    pub speed_mps: Option<f64>,

    /// Optional user target, `[lng, lat]`.
    pub target: Option<[f64; 2]>,

    pub movement_interval_ms:   u64,
    pub incident_interval_secs: u64,
    pub route_timeout_ms:       u64,

    /// Minimum gap between lifecycle entries of one incident.
    pub min_dwell_secs: u64,

    pub seed: u64,

    /// Feed query radius; incidents further away are dropped on merge.
    pub feed_radius_m: f64,

    /// Enables Mapbox routing.  Without it routes are straight lines.
    pub mapbox_token:    Option<String>,
    pub mapbox_base_url: Option<String>,

    /// JSON event feed endpoint.  Without it incidents are simulated.
    pub feed_url: Option<String>,

    /// Incidents present from the start, e.g. a fixed exercise incident.
    pub seed_incidents: Vec<FeedRecord>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_position:       [-122.4194, 37.7749],
            profile:                TravelProfile::Walking,
            speed_mps:              None,
            target:                 None,
            movement_interval_ms:   1_000,
            incident_interval_secs: 30,
            route_timeout_ms:       10_000,
            min_dwell_secs:         30,
            seed:                   42,
            feed_radius_m:          DEFAULT_FEED_RADIUS_M,
            mapbox_token:           None,
            mapbox_base_url:        None,
            feed_url:               None,
            seed_incidents:         Vec::new(),
        }
    }
}

impl SessionConfig {
    /// Parse and validate.
    pub fn from_toml_str(s: &str) -> SessionResult<Self> {
        let config: SessionConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> SessionResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&text)?;
        log::info!("loaded session config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Reject configurations the session cannot run with.
    pub fn validate(&self) -> SessionResult<()> {
        self.initial_coordinate()?;
        self.target_coordinate()?;
        if let Some(speed) = self.speed_mps {
            if !(speed.is_finite() && speed > 0.0) {
                return Err(CoreError::InvalidSpeed(speed).into());
            }
        }
        for (name, value) in [
            ("movement_interval_ms", self.movement_interval_ms),
            ("incident_interval_secs", self.incident_interval_secs),
            ("route_timeout_ms", self.route_timeout_ms),
        ] {
            if value == 0 {
                return Err(SessionError::Config(format!("{name} must be non-zero")));
            }
        }
        if !(self.feed_radius_m.is_finite() && self.feed_radius_m > 0.0) {
            return Err(SessionError::Config(format!("feed_radius_m must be positive (got {})", self.feed_radius_m)));
        }

        let mut seen = HashSet::new();
        for record in &self.seed_incidents {
            if !seen.insert(record.id.as_str()) {
                return Err(SessionError::Config(format!("duplicate seed incident id '{}'", record.id)));
            }
        }
        Ok(())
    }

    pub fn initial_coordinate(&self) -> Result<Coordinate, CoreError> {
        let [lon, lat] = self.initial_position;
        Coordinate::try_new(lon, lat)
    }

    pub fn target_coordinate(&self) -> Result<Option<Coordinate>, CoreError> {
        self.target.map(|[lon, lat]| Coordinate::try_new(lon, lat)).transpose()
    }

    /// Configured speed, or the profile default.
    pub fn speed(&self) -> f64 {
        self.speed_mps.unwrap_or_else(|| self.profile.default_speed_mps())
    }

    #[inline]
    pub fn movement_interval(&self) -> Duration {
        Duration::from_millis(self.movement_interval_ms)
    }

    #[inline]
    pub fn incident_interval(&self) -> Duration {
        Duration::from_secs(self.incident_interval_secs)
    }

    pub fn simulator_config(&self) -> SimulatorConfig {
        SimulatorConfig {
            agent:         AgentId(0),
            seed:          self.seed,
            tick_interval: self.movement_interval(),
            route_timeout: Duration::from_millis(self.route_timeout_ms),
            ..SimulatorConfig::default()
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            min_dwell:     Duration::from_secs(self.min_dwell_secs),
            feed_radius_m: self.feed_radius_m,
        }
    }

    /// Mapbox behind a straight-line fallback when a token is configured,
    /// plain straight lines otherwise.
    pub fn route_provider(&self) -> Box<dyn RouteProvider> {
        match &self.mapbox_token {
            Some(token) => {
                let mapbox = match &self.mapbox_base_url {
                    Some(url) => MapboxRouter::with_base_url(token.clone(), url.clone()),
                    None => MapboxRouter::new(token.clone()),
                };
                Box::new(FallbackRouter::new(mapbox))
            }
            None => Box::new(StraightLineRouter),
        }
    }

    /// The configured JSON feed, if any.
    pub fn event_feed(&self) -> Option<Arc<dyn EventFeed>> {
        self.feed_url
            .as_ref()
            .map(|url| Arc::new(JsonFeed::new(url.clone())) as Arc<dyn EventFeed>)
    }
}
