//! Incident records and their enumerations.
//!
//! An [`Incident`]'s current status, severity and description are always
//! those of its most recent [`TimelineEntry`].  The timeline is append-only
//! and never empty, so those three fields are private and only change
//! through [`Incident::push_entry`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sa_core::{Coordinate, IncidentId};
use serde::{Deserialize, Serialize};

use crate::IncidentError;

// ── Severity ──────────────────────────────────────────────────────────────────

/// Ordered severity scale: `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Every level, lowest first.
    pub const ALL: [Severity; 4] = [Severity::Low, Severity::Medium, Severity::High, Severity::Critical];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// One step up, or `None` at `Critical`.
    pub fn escalated(self) -> Option<Severity> {
        match self {
            Severity::Low => Some(Severity::Medium),
            Severity::Medium => Some(Severity::High),
            Severity::High => Some(Severity::Critical),
            Severity::Critical => None,
        }
    }

    /// One step down, or `None` at `Low`.
    pub fn deescalated(self) -> Option<Severity> {
        match self {
            Severity::Low => None,
            Severity::Medium => Some(Severity::Low),
            Severity::High => Some(Severity::Medium),
            Severity::Critical => Some(Severity::High),
        }
    }

    /// `High` or `Critical`.
    #[inline]
    pub fn is_elevated(self) -> bool {
        self >= Severity::High
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = IncidentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| IncidentError::InvalidRecord(format!("unknown severity '{s}'")))
    }
}

// ── IncidentStatus ────────────────────────────────────────────────────────────

/// Lifecycle status.  `Resolved` is terminal for the probabilistic
/// lifecycle; only an operator override moves an incident out of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Reported,
    Investigating,
    InProgress,
    Monitoring,
    Resolved,
}

impl IncidentStatus {
    pub const ALL: [IncidentStatus; 5] = [
        IncidentStatus::Reported,
        IncidentStatus::Investigating,
        IncidentStatus::InProgress,
        IncidentStatus::Monitoring,
        IncidentStatus::Resolved,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IncidentStatus::Reported => "reported",
            IncidentStatus::Investigating => "investigating",
            IncidentStatus::InProgress => "in_progress",
            IncidentStatus::Monitoring => "monitoring",
            IncidentStatus::Resolved => "resolved",
        }
    }

    #[inline]
    pub fn is_resolved(self) -> bool {
        self == IncidentStatus::Resolved
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IncidentStatus {
    type Err = IncidentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IncidentStatus::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| IncidentError::InvalidRecord(format!("unknown status '{s}'")))
    }
}

// ── Category ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Crime,
    Emergency,
    Weather,
    Traffic,
}

impl Category {
    pub const ALL: [Category; 4] = [Category::Crime, Category::Emergency, Category::Weather, Category::Traffic];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Crime => "crime",
            Category::Emergency => "emergency",
            Category::Weather => "weather",
            Category::Traffic => "traffic",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = IncidentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| IncidentError::InvalidRecord(format!("unknown category '{s}'")))
    }
}

/// Radius of the area an incident affects, by severity tier.
///
/// | Severity | Radius |
/// |----------|--------|
/// | low      | 50 m   |
/// | medium   | 150 m  |
/// | high     | 300 m  |
/// | critical | 500 m  |
///
/// Weather incidents cover twice the tier radius.
pub fn affected_radius_m(severity: Severity, category: Category) -> f64 {
    let base = match severity {
        Severity::Low => 50.0,
        Severity::Medium => 150.0,
        Severity::High => 300.0,
        Severity::Critical => 500.0,
    };
    if category == Category::Weather { base * 2.0 } else { base }
}

// ── Timeline ──────────────────────────────────────────────────────────────────

/// What a timeline entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineKind {
    /// Nothing changed, or an operator note.
    Update,
    StatusChange,
    /// Severity lowered (or set by an operator without rising).
    SeverityChange,
    /// Severity raised.
    Escalation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub timestamp:   DateTime<Utc>,
    pub status:      IncidentStatus,
    pub severity:    Severity,
    pub description: String,
    pub kind:        TimelineKind,
}

// ── Incident ──────────────────────────────────────────────────────────────────

/// A hazard or event record tracked by the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Incident {
    pub id:         IncidentId,
    pub category:   Category,
    pub location:   Coordinate,
    pub created_at: DateTime<Utc>,

    /// Metres from the observer, once an observer position is known.
    pub distance_to_observer: Option<f64>,

    pub affected_area_radius_m: Option<f64>,

    status:      IncidentStatus,
    severity:    Severity,
    description: String,
    timeline:    Vec<TimelineEntry>,
}

impl Incident {
    /// Create an incident with a single `update` entry stamped `created_at`.
    ///
    /// The affected radius defaults to the severity tier radius.
    pub fn new(
        id:          IncidentId,
        category:    Category,
        severity:    Severity,
        status:      IncidentStatus,
        location:    Coordinate,
        created_at:  DateTime<Utc>,
        description: impl Into<String>,
    ) -> Self {
        let description = description.into();
        Self {
            id,
            category,
            location,
            created_at,
            distance_to_observer: None,
            affected_area_radius_m: Some(affected_radius_m(severity, category)),
            status,
            severity,
            description: description.clone(),
            timeline: vec![TimelineEntry {
                timestamp: created_at,
                status,
                severity,
                description,
                kind: TimelineKind::Update,
            }],
        }
    }

    /// Override the affected radius (`None` = unknown extent).
    pub fn with_radius(mut self, radius_m: Option<f64>) -> Self {
        self.affected_area_radius_m = radius_m;
        self
    }

    #[inline]
    pub fn status(&self) -> IncidentStatus {
        self.status
    }

    #[inline]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[inline]
    pub fn timeline(&self) -> &[TimelineEntry] {
        &self.timeline
    }

    /// Most recent timeline entry.
    pub fn last_entry(&self) -> &TimelineEntry {
        // The constructor seeds one entry and entries are never removed.
        &self.timeline[self.timeline.len() - 1]
    }

    #[inline]
    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_entry().timestamp
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        !self.status.is_resolved()
    }

    /// Append `entry` and adopt its status, severity and description.
    pub fn push_entry(&mut self, entry: TimelineEntry) {
        self.status = entry.status;
        self.severity = entry.severity;
        self.description.clone_from(&entry.description);
        self.timeline.push(entry);
    }

    /// Recompute `distance_to_observer` for an observer at `position`.
    #[inline]
    pub fn observe(&mut self, position: Coordinate) {
        self.distance_to_observer = Some(self.location.distance_to(position));
    }
}
