//! Error types for tether-chat

use thiserror::Error;

/// Result type alias using tether-chat Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during a chat turn
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the protocol layer
    #[error(transparent)]
    Ai(#[from] tether_ai::Error),
}

impl Error {
    /// Connection, timeout or body-read failure
    pub fn is_transport(&self) -> bool {
        match self {
            Error::Ai(e) => e.is_transport(),
        }
    }

    /// Non-success HTTP status
    pub fn is_protocol(&self) -> bool {
        match self {
            Error::Ai(e) => e.is_protocol(),
        }
    }

    /// HTTP status of a protocol error
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Ai(e) => e.status(),
        }
    }

    /// Whether a caller-side retry may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Ai(e) => e.is_retryable(),
        }
    }
}
