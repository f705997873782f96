use thiserror::Error;

/// Errors that can occur while loading a simulation config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors talking to the simulation task.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("simulation task has shut down")]
    Closed,
    #[error("simulation task dropped the reply")]
    ReplyDropped,
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for TransportError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        TransportError::Closed
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for TransportError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        TransportError::ReplyDropped
    }
}
