//! Error types for tether-ai

use thiserror::Error;

/// Result type alias using tether-ai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Placeholder used when a failed response has no readable body
pub const NO_ERROR_DETAILS: &str = "No error details";

/// Reasons a settings write is rejected.
///
/// A rejected write leaves the store untouched and notifies nobody. Callers that
/// want silent-drop behaviour simply ignore the value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A timeout of zero length
    #[error("{field} timeout must be greater than zero")]
    ZeroTimeout { field: &'static str },

    /// Proxy port outside 1..=65535
    #[error("invalid proxy port {0} (must be between 1-65535)")]
    InvalidPort(u32),

    /// Chat path that is empty after trimming
    #[error("chat API endpoint cannot be empty")]
    EmptyChatPath,

    /// Custom header index out of range
    #[error("no custom header at index {0}")]
    HeaderIndex(usize),
}

/// Classification of transport-level failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connection refused, DNS failure, TLS handshake failure
    Connect,
    /// Connect, send or read timeout elapsed
    Timeout,
    /// The configured proxy rejected or failed the request
    Proxy,
    /// Success status but the body could not be read
    Body,
    /// Anything else raised while issuing the request
    Request,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Proxy => "proxy",
            TransportErrorKind::Body => "body",
            TransportErrorKind::Request => "request",
        };
        f.write_str(name)
    }
}

/// Errors that can occur when talking to the inference server
#[derive(Error, Debug)]
pub enum Error {
    /// The request never produced a usable response
    #[error("Transport error ({kind}): {message}")]
    Transport {
        kind: TransportErrorKind,
        message: String,
    },

    /// Server answered with a non-success status
    #[error("Unexpected response code: {status}\nError: {body}")]
    Protocol { status: u16, body: String },

    /// JSON serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Settings could not be turned into a transport
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A settings write was rejected
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A settings observer failed
    #[error("Observer failed: {0}")]
    Observer(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else if err.is_body() || err.is_decode() {
            TransportErrorKind::Body
        } else {
            TransportErrorKind::Request
        };
        Self::Transport {
            kind,
            message: err.to_string(),
        }
    }
}

impl Error {
    /// Create a transport error of the given kind
    pub fn transport(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self::Transport {
            kind,
            message: message.into(),
        }
    }

    /// Create a protocol error from a status and body text
    pub fn protocol(status: u16, body: impl Into<String>) -> Self {
        Self::Protocol {
            status,
            body: body.into(),
        }
    }

    /// Whether this is a transport-level failure
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }

    /// Whether this is a non-success HTTP status
    pub fn is_protocol(&self) -> bool {
        matches!(self, Error::Protocol { .. })
    }

    /// HTTP status for protocol errors
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Protocol { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if a caller-side retry is likely to help.
    ///
    /// The client itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport { kind, .. } => {
                matches!(kind, TransportErrorKind::Connect | TransportErrorKind::Timeout)
            }
            Error::Protocol { status, body } => {
                *status == 429
                    || ((500..600).contains(status)
                        && !body.to_lowercase().contains("not found"))
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_carries_status_and_body() {
        let e = Error::protocol(500, "model not found");
        let text = e.to_string();
        assert!(text.contains("500"), "got: {}", text);
        assert!(text.contains("model not found"), "got: {}", text);
        assert_eq!(e.status(), Some(500));
        assert!(e.is_protocol());
        assert!(!e.is_transport());
    }

    #[test]
    fn test_transport_error_is_distinct_from_protocol() {
        let e = Error::transport(TransportErrorKind::Connect, "connection refused");
        assert!(e.is_transport());
        assert!(!e.is_protocol());
        assert_eq!(e.status(), None);
    }

    #[test]
    fn test_retryable_transport_kinds() {
        assert!(Error::transport(TransportErrorKind::Timeout, "slow").is_retryable());
        assert!(Error::transport(TransportErrorKind::Connect, "refused").is_retryable());
        assert!(!Error::transport(TransportErrorKind::Body, "truncated").is_retryable());
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(Error::protocol(429, "slow down").is_retryable());
        assert!(Error::protocol(503, "loading model").is_retryable());
        assert!(!Error::protocol(400, "bad request").is_retryable());
        assert!(!Error::protocol(500, "model not found").is_retryable());
    }

    #[test]
    fn test_config_errors_are_not_retryable() {
        assert!(!Error::from(ConfigError::EmptyChatPath).is_retryable());
        assert!(!Error::InvalidConfig("bad proxy".into()).is_retryable());
    }

    #[test]
    fn test_config_error_messages() {
        assert_eq!(
            ConfigError::ZeroTimeout { field: "read" }.to_string(),
            "read timeout must be greater than zero"
        );
        assert!(ConfigError::InvalidPort(70000).to_string().contains("70000"));
    }
}
