//! `sa-core` — foundational types for the situational-awareness core.
//!
//! This crate is a dependency of every other `sa-*` crate.  It intentionally
//! has no `sa-*` dependencies and minimal external ones (`rand`, `chrono`
//! and `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module          | Contents                                              |
//! |-----------------|-------------------------------------------------------|
//! | [`ids`]         | `AgentId`, `IncidentId`                               |
//! | [`geo`]         | `Coordinate`, haversine distance, projection, bearing |
//! | [`time`]        | `Tick`, `SimClock`                                    |
//! | [`rng`]         | `AgentRng`, `SimRng`, `RandomSource`, `FixedDraws`    |
//! | [`profile`]     | `TravelProfile` enum                                  |
//! | [`error`]       | `CoreError`, `CoreResult`                             |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod error;
pub mod geo;
pub mod ids;
pub mod profile;
pub mod rng;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{CoreError, CoreResult};
pub use geo::{Coordinate, EARTH_RADIUS_M, destination_point, distance, initial_bearing, move_towards};
pub use ids::{AgentId, IncidentId};
pub use profile::TravelProfile;
pub use rng::{AgentRng, FixedDraws, RandomSource, SimRng};
pub use time::{SimClock, Tick};
