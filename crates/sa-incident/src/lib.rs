//! `sa-incident` — incidents, their lifecycle, feeds, and safety.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                         |
//! |---------------|------------------------------------------------------------------|
//! | [`model`]     | `Incident`, `Severity`, `IncidentStatus`, `Category`, timeline   |
//! | [`lifecycle`] | Transition table and the pure `step` function                    |
//! | [`engine`]    | `IncidentEngine` — dwell-gated ticks, overrides, operator views  |
//! | [`feed`]      | `EventFeed` trait, `FeedRecord`, `JsonFeed`, `SimulatedFeed`     |
//! | [`safety`]    | `classify`, `assess`, `SafetyAssessment`                         |
//! | [`error`]     | `IncidentError`, `FeedError`                                     |
//!
//! # Feature flags
//!
//! | Flag   | Effect                                          |
//! |--------|-------------------------------------------------|
//! | `http` | Enables `JsonFeed` (reqwest).  On by default.   |

pub mod engine;
pub mod error;
pub mod feed;
pub mod lifecycle;
pub mod model;
pub mod safety;


pub use engine::{DEFAULT_MIN_DWELL, EngineConfig, IncidentEngine, IncidentFilter, IncidentSummary};
pub use error::{FeedError, FeedResult, IncidentError, IncidentResult};
#[cfg(feature = "http")]
pub use feed::JsonFeed;
pub use feed::{DEFAULT_FEED_RADIUS_M, EventFeed, FeedRecord, SimulatedFeed, generate_records, parse_records};
pub use lifecycle::{IncidentState, Transition};
pub use model::{
    Category, Incident, IncidentStatus, Severity, TimelineEntry, TimelineKind, affected_radius_m,
};
pub use safety::{SafetyAssessment, SafetyLevel, assess, classify};
