use sa_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MobilityError {
    #[error("invalid simulator configuration: {0}")]
    InvalidConfiguration(#[from] CoreError),

    #[error("movement simulator must be created inside a Tokio runtime")]
    NoRuntime,
}

pub type MobilityResult<T> = Result<T, MobilityError>;
