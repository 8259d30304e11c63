//! Routing error type.

use thiserror::Error;

/// Errors produced by route providers.
///
/// None of these reach the consumer: the movement simulator recovers from
/// every variant locally.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("route provider unavailable: {0}")]
    Unavailable(String),

    #[error("no route found")]
    NoRoute,

    #[error("route request timed out after {0} ms")]
    Timeout(u64),

    #[error("routing API returned HTTP {0}")]
    Status(u16),

    #[error("malformed routing response: {0}")]
    Parse(String),

    #[cfg(feature = "mapbox")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

pub type RoutingResult<T> = Result<T, RoutingError>;
