//! Error types.

use std::io;

use thiserror::Error;

/// Errors produced while configuring or driving a [`Logger`](crate::Logger).
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("`service` is mandatory")]
    MissingService,

    #[error("unknown level `{0}`")]
    UnknownLevel(String),

    #[error("level `{0}` is configured more than once")]
    DuplicateLevel(String),

    #[error("at least one level must be configured")]
    NoLevels,

    #[error("rank of level `{0}` must be an integer")]
    InvalidRank(String),

    /// The logger was torn down with `destroy()`.
    #[error("logger has been destroyed")]
    Destroyed,

    #[error("sink write failed: {0}")]
    Sink(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, LoggerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_service_message() {
        let msg = LoggerError::MissingService.to_string();
        assert!(msg.contains("`service` is mandatory"));
    }

    #[test]
    fn test_io_error_conversion() {
        let err: LoggerError = io::Error::new(io::ErrorKind::BrokenPipe, "closed").into();
        assert!(matches!(err, LoggerError::Sink(_)));
    }
}
