//! `sa-routing` — route provider abstraction and adapters.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                    |
//! |--------------|-------------------------------------------------------------|
//! | [`provider`] | `RouteProvider` trait, `StraightLineRouter`, `FallbackRouter` |
//! | [`mapbox`]   | `MapboxRouter` (feature = `"mapbox"` only)                  |
//! | [`error`]    | `RoutingError`, `RoutingResult<T>`                          |
//!
//! # Failure contract
//!
//! Providers report failure as a [`RoutingError`].  Callers that must never
//! see an error convert at the boundary, either with
//! [`fetch_route_or_empty`] (failure → empty route) or by wrapping the
//! provider in a [`FallbackRouter`] (failure → two-point straight path).
//!
//! # Feature flags
//!
//! | Flag     | Effect                                                      |
//! |----------|-------------------------------------------------------------|
//! | `mapbox` | Enables the Mapbox Directions client via `reqwest` (default). |

pub mod error;
pub mod provider;

#[cfg(feature = "mapbox")]
pub mod mapbox;


pub use error::{RoutingError, RoutingResult};
pub use provider::{
    FallbackRouter, RouteProvider, StraightLineRouter, fetch_route_or_empty, route_length_m,
};

#[cfg(feature = "mapbox")]
pub use mapbox::MapboxRouter;
