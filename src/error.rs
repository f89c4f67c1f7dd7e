use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure a caller can observe.
///
/// `Encode`, `Decode` and `InvalidArgument` are raised locally and never touch
/// the connection. `Server` carries an error reply verbatim and leaves the
/// connection usable. `Connection` and `Protocol` are fatal: they are broadcast
/// to every pending request and the connection ends up closed.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("encoding error: {0}")]
    Encode(String),

    #[error("decoding error: {0}")]
    Decode(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Server(String),

    #[error("connection error: {0}")]
    Connection(Arc<std::io::Error>),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("not connected")]
    NotConnected,

    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn connection_closed(reason: &str) -> Self {
        Error::Connection(Arc::new(std::io::Error::new(
            std::io::ErrorKind::ConnectionAborted,
            reason.to_string(),
        )))
    }

    /// True for errors that end the connection.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Connection(_) | Error::Protocol(_))
    }

    /// The server-provided message for error replies.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Error::Server(message) => Some(message),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Connection(Arc::new(e))
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::Config(e.to_string())
    }
}
