//! Proximity-based safety classification for the observer.

use std::fmt;

use serde::Serialize;

use crate::{Incident, Severity};

/// Below this distance any incident is critical, whatever its severity.
pub const CRITICAL_RADIUS_M: f64 = 40.0;

/// Below this distance a high/critical incident puts the observer at risk.
pub const AT_RISK_RADIUS_M: f64 = 100.0;

/// Below this distance a high/critical incident warrants caution.
pub const CAUTION_RADIUS_M: f64 = 250.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyLevel {
    Safe,
    Caution,
    AtRisk,
    Critical,
}

impl SafetyLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            SafetyLevel::Safe => "safe",
            SafetyLevel::Caution => "caution",
            SafetyLevel::AtRisk => "at_risk",
            SafetyLevel::Critical => "critical",
        }
    }

    /// Headline shown to the observer.
    pub fn message(self) -> &'static str {
        match self {
            SafetyLevel::Safe => "Safe",
            SafetyLevel::Caution => "Exercise Caution",
            SafetyLevel::AtRisk => "At Risk",
            SafetyLevel::Critical => "Critical Risk",
        }
    }
}

impl fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SafetyAssessment {
    pub level:              SafetyLevel,
    pub nearest_distance_m: Option<f64>,
    pub nearest_severity:   Option<Severity>,
    /// Headline, e.g. `"At Risk"`.
    pub message:            String,
    /// Distance detail, e.g. `"Within 62m of high risk"`.
    pub detail:             String,
}

impl SafetyAssessment {
    fn all_clear() -> Self {
        Self {
            level:              SafetyLevel::Safe,
            nearest_distance_m: None,
            nearest_severity:   None,
            message:            SafetyLevel::Safe.message().to_owned(),
            detail:             "No nearby incidents detected".to_owned(),
        }
    }
}

/// Classify a nearest incident at `distance_m` with `severity`.
///
/// | Distance       | high / critical | low / medium |
/// |----------------|-----------------|--------------|
/// | `< 40`         | critical        | critical     |
/// | `40 ..< 100`   | at_risk         | caution      |
/// | `100 ..< 250`  | caution         | safe         |
/// | `>= 250`       | safe            | safe         |
pub fn classify(distance_m: f64, severity: Severity) -> SafetyLevel {
    if distance_m < CRITICAL_RADIUS_M {
        SafetyLevel::Critical
    } else if distance_m < AT_RISK_RADIUS_M {
        if severity.is_elevated() { SafetyLevel::AtRisk } else { SafetyLevel::Caution }
    } else if distance_m < CAUTION_RADIUS_M {
        if severity.is_elevated() { SafetyLevel::Caution } else { SafetyLevel::Safe }
    } else {
        SafetyLevel::Safe
    }
}

/// Assess the observer against `incidents`.
///
/// Only active incidents with a known distance count.  Among those at the
/// minimal distance the highest severity wins.
pub fn assess<'a, I>(incidents: I) -> SafetyAssessment
where
    I: IntoIterator<Item = &'a Incident>,
{
    let nearest = incidents
        .into_iter()
        .filter(|i| i.is_active())
        .filter_map(|i| i.distance_to_observer.filter(|d| d.is_finite()).map(|d| (d, i.severity())))
        .min_by(|(da, sa), (db, sb)| da.total_cmp(db).then(sb.cmp(sa)));

    let Some((d, severity)) = nearest else {
        return SafetyAssessment::all_clear();
    };

    let level = classify(d, severity);
    let metres = d.round();
    let detail = match level {
        SafetyLevel::Critical => format!("Within {metres}m of {severity} incident"),
        SafetyLevel::AtRisk => format!("Within {metres}m of {severity} risk"),
        SafetyLevel::Caution if d < AT_RISK_RADIUS_M => format!("Within {metres}m of incident"),
        SafetyLevel::Caution => format!("{metres}m from {severity} risk"),
        SafetyLevel::Safe if d < CAUTION_RADIUS_M => format!("{metres}m from nearest incident"),
        SafetyLevel::Safe => "No nearby incidents detected".to_owned(),
    };

    SafetyAssessment {
        level,
        nearest_distance_m: Some(d),
        nearest_severity: Some(severity),
        message: level.message().to_owned(),
        detail,
    }
}
