//! `IncidentEngine` — owns the incident population and evolves it.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;

use chrono::{DateTime, Utc};
use sa_core::{Coordinate, IncidentId, RandomSource};
use serde::Serialize;

use crate::lifecycle::{self, IncidentState, status_description};
use crate::safety::{self, SafetyAssessment};
use crate::{
    Category, DEFAULT_FEED_RADIUS_M, Incident, IncidentError, IncidentResult, IncidentStatus,
    Severity, TimelineEntry, TimelineKind,
};

/// Minimum time between two lifecycle entries of one incident.
pub const DEFAULT_MIN_DWELL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Minimum time since the last timeline entry before the lifecycle may
    /// touch an incident again.  Default: 30 s.
    pub min_dwell: Duration,

    /// Incoming records further than this from the observer are dropped.
    /// Default: 2 km.
    pub feed_radius_m: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { min_dwell: DEFAULT_MIN_DWELL, feed_radius_m: DEFAULT_FEED_RADIUS_M }
    }
}

// ── Filtering and summaries ───────────────────────────────────────────────────

/// Operator filter.  Empty sets match anything; `text` is a
/// case-insensitive substring match over description, category and id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncidentFilter {
    pub categories: BTreeSet<Category>,
    pub severities: BTreeSet<Severity>,
    pub statuses:   BTreeSet<IncidentStatus>,
    pub text:       String,
}

impl IncidentFilter {
    pub fn matches(&self, incident: &Incident) -> bool {
        if !self.categories.is_empty() && !self.categories.contains(&incident.category) {
            return false;
        }
        if !self.severities.is_empty() && !self.severities.contains(&incident.severity()) {
            return false;
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&incident.status()) {
            return false;
        }
        let needle = self.text.trim().to_lowercase();
        needle.is_empty()
            || incident.description().to_lowercase().contains(&needle)
            || incident.category.as_str().contains(&needle)
            || incident.id.as_str().to_lowercase().contains(&needle)
    }
}

/// Counts behind the operator dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IncidentSummary {
    pub total:       usize,
    pub active:      usize,
    /// Active incidents at `critical` severity.
    pub critical:    usize,
    pub by_category: BTreeMap<Category, usize>,
    pub by_severity: BTreeMap<Severity, usize>,
    pub by_status:   BTreeMap<IncidentStatus, usize>,
}

// ── IncidentEngine ────────────────────────────────────────────────────────────

/// Holds every incident seen this session, in insertion order.
///
/// Incidents are never removed; resolved ones drop out of the active views.
#[derive(Debug, Default)]
pub struct IncidentEngine {
    incidents: Vec<Incident>,
    index:     HashMap<IncidentId, usize>,
    observer:  Option<Coordinate>,
    config:    EngineConfig,
}

impl IncidentEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { incidents: Vec::new(), index: HashMap::new(), observer: None, config }
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.incidents.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty()
    }

    #[inline]
    pub fn observer(&self) -> Option<Coordinate> {
        self.observer
    }

    /// All incidents, resolved included, in insertion order.
    #[inline]
    pub fn incidents(&self) -> &[Incident] {
        &self.incidents
    }

    pub fn get(&self, id: &IncidentId) -> Option<&Incident> {
        self.index.get(id).map(|&i| &self.incidents[i])
    }

    fn get_mut(&mut self, id: &IncidentId) -> IncidentResult<&mut Incident> {
        match self.index.get(id) {
            Some(&i) => Ok(&mut self.incidents[i]),
            None => Err(IncidentError::NotFound(id.clone())),
        }
    }

    // ── Population ────────────────────────────────────────────────────────

    /// Add `incident` unless one with the same id exists.  Returns `true`
    /// if it was added.
    pub fn insert(&mut self, mut incident: Incident) -> bool {
        if self.index.contains_key(&incident.id) {
            return false;
        }
        if let Some(observer) = self.observer {
            incident.observe(observer);
        }
        self.index.insert(incident.id.clone(), self.incidents.len());
        self.incidents.push(incident);
        true
    }

    /// Merge a batch from a feed.
    ///
    /// Existing ids keep their lifecycle (the incoming copy is ignored).
    /// With an observer known, records beyond `feed_radius_m` are dropped.
    /// Returns the number of incidents added.
    pub fn merge(&mut self, batch: impl IntoIterator<Item = Incident>) -> usize {
        let radius = self.config.feed_radius_m;
        let mut added = 0;
        for incident in batch {
            if let Some(observer) = self.observer {
                if incident.location.distance_to(observer) > radius {
                    log::debug!("dropping {} beyond feed radius", incident.id);
                    continue;
                }
            }
            if self.insert(incident) {
                added += 1;
            }
        }
        if added > 0 {
            log::info!("merged {added} new incidents ({} total)", self.incidents.len());
        }
        added
    }

    /// Recompute every incident's distance for an observer at `position`.
    pub fn observe(&mut self, position: Coordinate) {
        self.observer = Some(position);
        for incident in &mut self.incidents {
            incident.observe(position);
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Run one lifecycle step for every eligible incident at time `now`.
    ///
    /// Eligible means not resolved and at least `min_dwell` since the last
    /// timeline entry.  Each eligible incident gets exactly one entry.
    /// Returns the ids whose status or severity changed.
    ///
    /// Resolved incidents are frozen: they get no further `update` entries
    /// and cannot de-escalate, so their timeline ends at resolution.  Only
    /// the operator overrides and [`add_note`](Self::add_note) touch them.
    pub fn tick<R: RandomSource + ?Sized>(&mut self, now: DateTime<Utc>, rng: &mut R) -> Vec<IncidentId> {
        let min_dwell = self.config.min_dwell;
        let mut changed = Vec::new();

        for incident in &mut self.incidents {
            if !incident.is_active() || !dwell_elapsed(incident.last_updated(), now, min_dwell) {
                continue;
            }
            let state = IncidentState { status: incident.status(), severity: incident.severity() };
            let next = lifecycle::step(state, rng);
            if !next.is_unchanged() {
                log::info!(
                    "{}: {}/{} -> {}/{} ({:?})",
                    incident.id, state.status, state.severity, next.status, next.severity, next.kind
                );
                changed.push(incident.id.clone());
            }
            let description = next.description.unwrap_or_else(|| incident.description().to_owned());
            incident.push_entry(TimelineEntry {
                timestamp: now,
                status: next.status,
                severity: next.severity,
                description,
                kind: next.kind,
            });
        }
        changed
    }

    // ── Operator actions ──────────────────────────────────────────────────

    /// Force `status`, bypassing the transition table and dwell gate.
    ///
    /// # Errors
    ///
    /// [`IncidentError::NotFound`] for an unknown id.
    pub fn override_status(&mut self, id: &IncidentId, status: IncidentStatus, now: DateTime<Utc>) -> IncidentResult<()> {
        let incident = self.get_mut(id)?;
        log::info!("{id}: operator set status {} -> {status}", incident.status());
        let severity = incident.severity();
        incident.push_entry(TimelineEntry {
            timestamp: now,
            status,
            severity,
            description: status_description(status).to_owned(),
            kind: TimelineKind::StatusChange,
        });
        Ok(())
    }

    /// Force `severity`.  Recorded as an escalation when it rises.
    ///
    /// # Errors
    ///
    /// [`IncidentError::NotFound`] for an unknown id.
    pub fn override_severity(&mut self, id: &IncidentId, severity: Severity, now: DateTime<Utc>) -> IncidentResult<()> {
        let incident = self.get_mut(id)?;
        let previous = incident.severity();
        let (kind, description) = if severity > previous {
            (TimelineKind::Escalation, format!("Incident escalated to {severity} severity"))
        } else if severity < previous {
            (TimelineKind::SeverityChange, format!("Severity reduced to {severity}"))
        } else {
            (TimelineKind::SeverityChange, format!("Severity confirmed as {severity}"))
        };
        log::info!("{id}: operator set severity {previous} -> {severity}");
        let status = incident.status();
        incident.push_entry(TimelineEntry { timestamp: now, status, severity, description, kind });
        Ok(())
    }

    /// Append an operator note as an `update` entry.
    ///
    /// # Errors
    ///
    /// [`IncidentError::NotFound`] for an unknown id,
    /// [`IncidentError::InvalidRecord`] for a blank note.
    pub fn add_note(&mut self, id: &IncidentId, text: &str, now: DateTime<Utc>) -> IncidentResult<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(IncidentError::InvalidRecord("empty note".into()));
        }
        let incident = self.get_mut(id)?;
        let (status, severity) = (incident.status(), incident.severity());
        incident.push_entry(TimelineEntry {
            timestamp: now,
            status,
            severity,
            description: text.to_owned(),
            kind: TimelineKind::Update,
        });
        Ok(())
    }

    // ── Views ─────────────────────────────────────────────────────────────

    /// Non-resolved incidents, in insertion order.
    pub fn active(&self) -> Vec<&Incident> {
        self.incidents.iter().filter(|i| i.is_active()).collect()
    }

    /// Active incidents, nearest first; unknown distances last.
    pub fn by_distance(&self) -> Vec<&Incident> {
        let mut v = self.active();
        v.sort_by(|a, b| cmp_distance(a.distance_to_observer, b.distance_to_observer));
        v
    }

    /// Active incidents, most severe first; nearest first within a level.
    pub fn by_severity(&self) -> Vec<&Incident> {
        let mut v = self.active();
        v.sort_by(|a, b| {
            b.severity()
                .cmp(&a.severity())
                .then_with(|| cmp_distance(a.distance_to_observer, b.distance_to_observer))
        });
        v
    }

    /// Every incident (resolved included) matching `filter`.
    pub fn filter(&self, filter: &IncidentFilter) -> Vec<&Incident> {
        self.incidents.iter().filter(|i| filter.matches(i)).collect()
    }

    pub fn summary(&self) -> IncidentSummary {
        let mut s = IncidentSummary { total: self.incidents.len(), ..IncidentSummary::default() };
        for incident in &self.incidents {
            *s.by_category.entry(incident.category).or_default() += 1;
            *s.by_severity.entry(incident.severity()).or_default() += 1;
            *s.by_status.entry(incident.status()).or_default() += 1;
            if incident.is_active() {
                s.active += 1;
                if incident.severity() == Severity::Critical {
                    s.critical += 1;
                }
            }
        }
        s
    }

    /// Safety assessment for the current observer position.
    pub fn assess(&self) -> SafetyAssessment {
        safety::assess(&self.incidents)
    }
}

fn dwell_elapsed(last: DateTime<Utc>, now: DateTime<Utc>, min_dwell: Duration) -> bool {
    // A negative gap (entry stamped in the future) never passes.
    (now - last).to_std().is_ok_and(|gap| gap >= min_dwell)
}

fn cmp_distance(a: Option<f64>, b: Option<f64>) -> std::cmp::Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    }
}
