//! Error types for the `realtime` layer.
use std::error::Error as StdError;
use std::fmt;

/// Top-level realtime error type.
///
/// Only configuration problems (a base URL that cannot be turned into an
/// events endpoint) surface as `Result`s to callers. Transport-level
/// failures are contained inside the connection task: they are logged,
/// recorded as the client's human-readable last-error string, and handed to
/// the retry policy instead of propagating.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    /// The configured base URL cannot be turned into an events endpoint.
    Config(String),
    /// The channel failed at the transport level.
    Transport(String),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Error {
            source: None,
            error_kind: ErrorKind::Config(message.into()),
        }
    }

    /// The human-readable message callers may surface to a user.
    pub fn message(&self) -> &str {
        match &self.error_kind {
            ErrorKind::Config(message) => message,
            ErrorKind::Transport(message) => message,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error {
            error_kind: ErrorKind::Config(format!("Invalid backend base URL: {err}")),
            source: Some(Box::new(err)),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Error {
            error_kind: ErrorKind::Transport(format!("Events channel failure: {err}")),
            source: Some(Box::new(err)),
        }
    }
}
