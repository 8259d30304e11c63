use sa_core::IncidentId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IncidentError {
    #[error("no incident with id '{0}'")]
    NotFound(IncidentId),

    #[error("invalid incident record: {0}")]
    InvalidRecord(String),
}

pub type IncidentResult<T> = Result<T, IncidentError>;

/// Failures talking to an external event feed.
///
/// Always recovered by the caller (empty result or simulated incidents);
/// never surfaced to consumers.
#[derive(Debug, Error)]
pub enum FeedError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed returned HTTP {0}")]
    Status(u16),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("feed unavailable: {0}")]
    Unavailable(String),
}

pub type FeedResult<T> = Result<T, FeedError>;
