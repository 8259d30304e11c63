use sa_core::CoreError;
use sa_incident::IncidentError;
use sa_mobility::MobilityError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session configuration error: {0}")]
    Config(String),

    #[error("could not parse session config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("could not read session config: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Mobility(#[from] MobilityError),

    #[error(transparent)]
    Incident(#[from] IncidentError),
}

pub type SessionResult<T> = Result<T, SessionError>;
