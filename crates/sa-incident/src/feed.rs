//! External event feeds.
//!
//! A feed answers "what is happening near this point?" with a list of
//! loosely specified [`FeedRecord`]s.  Every field except `id` may be
//! missing; [`FeedRecord::into_incident`] fills the gaps.
//!
//! Two implementations ship here:
//!
//! - [`JsonFeed`] (feature `http`) — GET an endpoint returning a JSON array.
//! - [`SimulatedFeed`] — synthesises 3–6 plausible incidents near the query
//!   centre; used on its own or as the fallback when a real feed fails.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use sa_core::{Coordinate, IncidentId, RandomSource, SimRng, destination_point};
use serde::{Deserialize, Serialize};

use crate::lifecycle::{incident_description, initial_status};
use crate::{
    Category, FeedError, Incident, IncidentError, IncidentResult, IncidentStatus, Severity,
    affected_radius_m,
};

/// Radius around the observer that feeds are queried for, and beyond which
/// merged records are dropped.
pub const DEFAULT_FEED_RADIUS_M: f64 = 2_000.0;

// ── EventFeed ─────────────────────────────────────────────────────────────────

#[async_trait]
pub trait EventFeed: Send + Sync {
    /// Records within `radius_m` of `center`.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] if the source cannot be reached or answers
    /// with something unparseable.
    async fn fetch_near(&self, center: Coordinate, radius_m: f64) -> Result<Vec<FeedRecord>, FeedError>;
}

#[async_trait]
impl<F: EventFeed + ?Sized> EventFeed for Box<F> {
    async fn fetch_near(&self, center: Coordinate, radius_m: f64) -> Result<Vec<FeedRecord>, FeedError> {
        (**self).fetch_near(center, radius_m).await
    }
}

#[async_trait]
impl<F: EventFeed + ?Sized> EventFeed for Arc<F> {
    async fn fetch_near(&self, center: Coordinate, radius_m: f64) -> Result<Vec<FeedRecord>, FeedError> {
        (**self).fetch_near(center, radius_m).await
    }
}

// ── FeedRecord ────────────────────────────────────────────────────────────────

/// One incident as delivered by a feed or written in configuration.
///
/// Field aliases accept the `type` / `timestamp` / `affectedArea` names
/// used by browser-side feeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedRecord {
    pub id: String,

    #[serde(default, alias = "type")]
    pub category: Option<Category>,

    #[serde(default)]
    pub severity: Option<Severity>,

    #[serde(default)]
    pub status: Option<IncidentStatus>,

    /// `[lng, lat]`.
    #[serde(default)]
    pub location: Option<[f64; 2]>,

    #[serde(default, alias = "timestamp")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default, alias = "affectedArea")]
    pub affected_area_radius_m: Option<f64>,
}

impl FeedRecord {
    /// A record with only an id; every other field defaults.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id:                     id.into(),
            category:               None,
            severity:               None,
            status:                 None,
            location:               None,
            created_at:             None,
            description:            None,
            affected_area_radius_m: None,
        }
    }

    /// Build an [`Incident`], defaulting missing fields.
    ///
    /// | Field       | Default                                   |
    /// |-------------|-------------------------------------------|
    /// | category    | `emergency`                               |
    /// | severity    | `low`                                     |
    /// | status      | `reported`                                |
    /// | location    | `center`                                  |
    /// | created_at  | `now`                                     |
    /// | description | category × severity headline              |
    /// | radius      | severity tier radius (×2 for weather)     |
    ///
    /// # Errors
    ///
    /// [`IncidentError::InvalidRecord`] for a blank id, an out-of-range
    /// location, or a negative/non-finite radius.
    pub fn into_incident(self, center: Coordinate, now: DateTime<Utc>) -> IncidentResult<Incident> {
        if self.id.trim().is_empty() {
            return Err(IncidentError::InvalidRecord("blank id".into()));
        }
        let location = match self.location {
            Some([lon, lat]) => Coordinate::try_new(lon, lat)
                .map_err(|e| IncidentError::InvalidRecord(format!("{}: {e}", self.id)))?,
            None => center,
        };
        if let Some(r) = self.affected_area_radius_m {
            if !(r.is_finite() && r >= 0.0) {
                return Err(IncidentError::InvalidRecord(format!("{}: bad radius {r}", self.id)));
            }
        }

        let category = self.category.unwrap_or(Category::Emergency);
        let severity = self.severity.unwrap_or(Severity::Low);
        let description = self
            .description
            .unwrap_or_else(|| incident_description(category, severity).to_owned());
        let radius = self
            .affected_area_radius_m
            .unwrap_or_else(|| affected_radius_m(severity, category));

        Ok(Incident::new(
            IncidentId::new(self.id),
            category,
            severity,
            self.status.unwrap_or(IncidentStatus::Reported),
            location,
            self.created_at.unwrap_or(now),
            description,
        )
        .with_radius(Some(radius)))
    }
}

// ── Simulated generation ──────────────────────────────────────────────────────

/// Generate 3–6 incidents within `radius_m` of `center`.
///
/// Category and severity are uniform; the initial status follows
/// [`initial_status`]; `created_at` falls within the hour before `now`.
/// Ids are `"{prefix}-{n}"`.
pub fn generate_records<R: RandomSource + ?Sized>(
    center:   Coordinate,
    radius_m: f64,
    now:      DateTime<Utc>,
    prefix:   &str,
    rng:      &mut R,
) -> Vec<FeedRecord> {
    let count = 3 + rng.index(4);
    (0..count)
        .map(|n| {
            let category = Category::ALL[rng.index(Category::ALL.len())];
            let severity = Severity::ALL[rng.index(Severity::ALL.len())];
            let d = rng.between(0.0, radius_m);
            let bearing = rng.between(0.0, 360.0);
            let location = destination_point(center, bearing, d);
            let status = initial_status(severity, rng);
            let age_ms = rng.between(0.0, 3_600_000.0) as i64;
            let created_at = now - TimeDelta::milliseconds(age_ms);

            FeedRecord {
                id:                     format!("{prefix}-{n}"),
                category:               Some(category),
                severity:               Some(severity),
                status:                 Some(status),
                location:               Some([location.lon, location.lat]),
                created_at:             Some(created_at),
                description:            Some(incident_description(category, severity).to_owned()),
                affected_area_radius_m: Some(affected_radius_m(severity, category)),
            }
        })
        .collect()
}

/// Feed that invents incidents instead of querying anything.
///
/// Each call produces a fresh batch with ids `sim-{batch}-{n}`, so repeated
/// fetches add new incidents rather than colliding with earlier ones.
pub struct SimulatedFeed {
    rng:   Mutex<SimRng>,
    batch: AtomicU64,
}

impl SimulatedFeed {
    pub fn new(seed: u64) -> Self {
        Self { rng: Mutex::new(SimRng::new(seed)), batch: AtomicU64::new(0) }
    }

    /// Generate a batch stamped relative to `now`.
    pub fn generate(&self, center: Coordinate, radius_m: f64, now: DateTime<Utc>) -> Vec<FeedRecord> {
        let batch = self.batch.fetch_add(1, Ordering::Relaxed);
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        generate_records(center, radius_m, now, &format!("sim-{batch}"), &mut *rng)
    }
}

#[async_trait]
impl EventFeed for SimulatedFeed {
    async fn fetch_near(&self, center: Coordinate, radius_m: f64) -> Result<Vec<FeedRecord>, FeedError> {
        Ok(self.generate(center, radius_m, Utc::now()))
    }
}

// ── JsonFeed ──────────────────────────────────────────────────────────────────

/// Parse a feed response body: a JSON array of [`FeedRecord`]s.
///
/// Elements that do not deserialise (missing id, unknown enum value, …)
/// are skipped with a warning; the rest of the batch is kept.
///
/// # Errors
///
/// [`FeedError::Json`] if the body is not a JSON array.
pub fn parse_records(body: &[u8]) -> Result<Vec<FeedRecord>, FeedError> {
    let values: Vec<serde_json::Value> = serde_json::from_slice(body)?;
    let records = values
        .into_iter()
        .enumerate()
        .filter_map(|(n, value)| match serde_json::from_value::<FeedRecord>(value) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("skipping feed element {n}: {e}");
                None
            }
        })
        .collect();
    Ok(records)
}

/// Feed backed by an HTTP endpoint.
///
/// Queried as `GET {url}?lat=..&lng=..&radius=..`; the response must be a
/// JSON array of records.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct JsonFeed {
    client: reqwest::Client,
    url:    String,
}

#[cfg(feature = "http")]
impl JsonFeed {
    pub fn new(url: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl EventFeed for JsonFeed {
    async fn fetch_near(&self, center: Coordinate, radius_m: f64) -> Result<Vec<FeedRecord>, FeedError> {
        let resp = self
            .client
            .get(&self.url)
            .query(&[("lat", center.lat), ("lng", center.lon), ("radius", radius_m)])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(FeedError::Status(resp.status().as_u16()));
        }

        let body = resp.bytes().await?;
        let records = parse_records(&body)?;
        log::info!("feed {} returned {} records", self.url, records.len());
        Ok(records)
    }
}
