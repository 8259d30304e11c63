//! The incident lifecycle as a pure transition function.
//!
//! [`step`] takes the current `(status, severity)` and a [`RandomSource`]
//! and returns the [`Transition`] to record.  It touches no clock and no
//! engine state, so tests drive it with scripted draws.
//!
//! # Draw order
//!
//! | # | Draw                 | Consumed when                              |
//! |---|----------------------|--------------------------------------------|
//! | 1 | status gate (30 %)   | always                                     |
//! | 2 | status pick          | status gate passed                         |
//! | 3 | severity gate (15 %) | always                                     |
//! | 4 | de-escalation coin   | severity gate passed and severity > `low`  |

use sa_core::RandomSource;

use crate::{Category, IncidentStatus, Severity, TimelineKind};

/// Probability that a tick samples a new status.
pub const STATUS_CHANGE_PROBABILITY: f64 = 0.30;

/// Probability that a tick attempts a severity change.
pub const SEVERITY_CHANGE_PROBABILITY: f64 = 0.15;

/// Given a severity change attempt, probability of de-escalating.
pub const DEESCALATION_PROBABILITY: f64 = 0.5;

/// Statuses reachable from `status`, sampled uniformly.
///
/// Repeated entries are intentional: staying put is one of the choices, so
/// e.g. `reported` moves on with probability ½ once the status gate passes.
pub fn next_statuses(status: IncidentStatus) -> &'static [IncidentStatus] {
    use IncidentStatus::*;
    match status {
        Reported => &[Investigating, Reported],
        Investigating => &[InProgress, Investigating, Monitoring],
        InProgress => &[Investigating, Monitoring, InProgress],
        Monitoring => &[Resolved, Monitoring],
        Resolved => &[Resolved],
    }
}

/// The part of an incident the lifecycle reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncidentState {
    pub status:   IncidentStatus,
    pub severity: Severity,
}

/// Outcome of one lifecycle step.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub status:   IncidentStatus,
    pub severity: Severity,
    pub kind:     TimelineKind,
    /// New description, or `None` to carry the previous one forward.
    pub description: Option<String>,
}

impl Transition {
    /// `true` when neither status nor severity changed.
    pub fn is_unchanged(&self) -> bool {
        self.kind == TimelineKind::Update
    }
}

/// Run one lifecycle step.
///
/// 1. With probability 30 %, pick uniformly from [`next_statuses`]; a
///    different pick becomes a `status_change`.
/// 2. Independently, with probability 15 %, try a severity change: with
///    probability ½ de-escalate one step (unless already `low`), otherwise
///    escalate one step if the incident was `in_progress` when the step
///    began and severity is below `critical`.  A severity change takes precedence
///    over a status change for the entry kind and description.
pub fn step<R: RandomSource + ?Sized>(state: IncidentState, rng: &mut R) -> Transition {
    let mut next = Transition {
        status:      state.status,
        severity:    state.severity,
        kind:        TimelineKind::Update,
        description: None,
    };

    if rng.chance(STATUS_CHANGE_PROBABILITY) {
        let options = next_statuses(state.status);
        let picked = options[rng.index(options.len())];
        if picked != state.status {
            next.status = picked;
            next.kind = TimelineKind::StatusChange;
            next.description = Some(status_description(picked).to_owned());
        }
    }

    if rng.chance(SEVERITY_CHANGE_PROBABILITY) {
        let lowered = state
            .severity
            .deescalated()
            .filter(|_| rng.chance(DEESCALATION_PROBABILITY));
        if let Some(lower) = lowered {
            next.severity = lower;
            next.kind = TimelineKind::SeverityChange;
            next.description = Some(format!("Severity reduced to {lower}"));
        } else if state.status == IncidentStatus::InProgress {
            if let Some(higher) = state.severity.escalated() {
                next.severity = higher;
                next.kind = TimelineKind::Escalation;
                next.description = Some(format!("Incident escalated to {higher} severity"));
            }
        }
    }

    next
}

/// Initial status for a freshly generated incident.
///
/// | Severity | Outcome                                   |
/// |----------|-------------------------------------------|
/// | critical | 70 % `in_progress`, else `investigating`  |
/// | high     | 50 % `investigating`, else `reported`     |
/// | medium   | 30 % `investigating`, else `reported`     |
/// | low      | `reported` (no draw)                      |
pub fn initial_status<R: RandomSource + ?Sized>(severity: Severity, rng: &mut R) -> IncidentStatus {
    match severity {
        Severity::Critical if rng.chance(0.7) => IncidentStatus::InProgress,
        Severity::Critical => IncidentStatus::Investigating,
        Severity::High if rng.chance(0.5) => IncidentStatus::Investigating,
        Severity::Medium if rng.chance(0.3) => IncidentStatus::Investigating,
        _ => IncidentStatus::Reported,
    }
}

/// Timeline description for a status change.
pub fn status_description(status: IncidentStatus) -> &'static str {
    match status {
        IncidentStatus::Reported => "Incident reported",
        IncidentStatus::Investigating => "Authorities are investigating",
        IncidentStatus::InProgress => "Active response in progress",
        IncidentStatus::Monitoring => "Situation being monitored",
        IncidentStatus::Resolved => "Incident resolved",
    }
}

/// Headline description for a new incident.
pub fn incident_description(category: Category, severity: Severity) -> &'static str {
    use Severity::*;
    match (category, severity) {
        (Category::Crime, Low) => "Minor disturbance reported in area",
        (Category::Crime, Medium) => "Police activity reported nearby",
        (Category::Crime, High) => "Active police investigation in progress",
        (Category::Crime, Critical) => "Major incident - avoid area",
        (Category::Emergency, Low) => "Medical response in area",
        (Category::Emergency, Medium) => "Emergency services responding",
        (Category::Emergency, High) => "Active emergency situation",
        (Category::Emergency, Critical) => "Critical emergency - evacuate if possible",
        (Category::Weather, Low) => "Weather advisory in effect",
        (Category::Weather, Medium) => "Weather warning issued",
        (Category::Weather, High) => "Severe weather conditions",
        (Category::Weather, Critical) => "Extreme weather - seek shelter",
        (Category::Traffic, Low) => "Minor traffic delays",
        (Category::Traffic, Medium) => "Traffic congestion reported",
        (Category::Traffic, High) => "Major traffic incident",
        (Category::Traffic, Critical) => "Road closure - use alternate route",
    }
}
