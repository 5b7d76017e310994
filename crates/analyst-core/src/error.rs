//! Error types for Analyst Core

use thiserror::Error;

use crate::channel::ConnectionState;

/// Result type alias using Analyst Error
pub type Result<T> = std::result::Result<T, Error>;

/// Analyst error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Connection failed: {0}")]
    ConnectionFailure(String),

    #[error("Connection was not confirmed within {0} ms")]
    ConnectTimeout(u64),

    #[error("Channel is not open (state: {0:?})")]
    ChannelNotReady(ConnectionState),

    #[error("Input could not be sent, the connection is not open")]
    DispatchRejected { text: String },

    #[error("Input is empty")]
    EmptyInput,

    #[error("Form data has already been sent for this session")]
    FormAlreadySent,

    #[error("Session has already been started")]
    AlreadyStarted,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error means the connection never became usable
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, Self::ConnectionFailure(_) | Self::ConnectTimeout(_))
    }

    /// Text the user typed that must not be lost, if any
    pub fn retained_input(&self) -> Option<&str> {
        match self {
            Self::DispatchRejected { text } => Some(text),
            _ => None,
        }
    }
}
