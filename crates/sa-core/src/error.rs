//! Core error type.
//!
//! Sub-crates define their own error enums and wrap `CoreError` as one
//! variant via `#[from]`, so invalid configuration detected here propagates
//! with `?` unchanged.

use thiserror::Error;

/// The error type for `sa-core` and a common base for sub-crates.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    #[error("invalid coordinate (lon {lon}, lat {lat})")]
    InvalidCoordinate { lon: f64, lat: f64 },

    #[error("speed must be a positive, finite number of metres per second (got {0})")]
    InvalidSpeed(f64),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Shorthand result type for `sa-core`.
pub type CoreResult<T> = Result<T, CoreError>;
