//! Travel profile shared by the route provider and the movement simulator.

use std::fmt;
use std::str::FromStr;

use crate::CoreError;

/// How the simulated agent travels.  Selects both the routing profile sent
/// to the provider and the default movement speed.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TravelProfile {
    /// On foot.
    #[default]
    Walking,
    /// City driving.
    Driving,
}

impl TravelProfile {
    /// Default speed in metres per second.
    ///
    /// | Profile | Speed      |
    /// |---------|------------|
    /// | Walking | 1.5 m/s    |
    /// | Driving | 13.9 m/s   |
    pub fn default_speed_mps(self) -> f64 {
        match self {
            TravelProfile::Walking => 1.5,
            TravelProfile::Driving => 13.9,
        }
    }

    /// Profile slug understood by routing providers.
    pub fn as_str(self) -> &'static str {
        match self {
            TravelProfile::Walking => "walking",
            TravelProfile::Driving => "driving",
        }
    }
}

impl fmt::Display for TravelProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TravelProfile {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "walking" | "walk" => Ok(TravelProfile::Walking),
            "driving" | "drive" | "car" => Ok(TravelProfile::Driving),
            other => Err(CoreError::Config(format!("unknown travel profile '{other}'"))),
        }
    }
}
