//! `sa-mobility` — the movement simulator.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                      |
//! |---------------|---------------------------------------------------------------|
//! | [`state`]     | `MovementState` — position, route, cursor, targets            |
//! | [`simulator`] | `MovementSimulator<P>` — per-tick advancement + async routing |
//! | [`error`]     | `MobilityError`, `MobilityResult<T>`                          |
//!
//! # Movement model (continuous great-circle steps)
//!
//! Each tick the agent moves `speed × tick_interval` metres along the
//! initial bearing towards exactly one point:
//!
//! 1. a pending user target, while no route is active;
//! 2. otherwise the current route waypoint;
//! 3. otherwise the last requested destination.
//!
//! Routes are fetched by spawned Tokio tasks.  `tick` never awaits: it
//! applies whichever responses have already arrived and moves on.  Every
//! request is stamped with the context generation, and responses from an
//! older generation (profile change, retarget) are dropped on arrival.

pub mod error;
pub mod simulator;
pub mod state;

#[cfg(test)]
mod tests;

pub use error::{MobilityError, MobilityResult};
pub use simulator::{MovementSimulator, SimulatorConfig, TARGET_REACHED_M, WAYPOINT_REACHED_M};
pub use state::MovementState;
