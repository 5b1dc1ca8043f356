//! tether-ai: chat protocol layer
//!
//! This crate holds the pieces that talk to an Ollama-compatible inference
//! server: the observable settings store, the HTTP transport built from it,
//! the chat request envelope, and the line-delimited JSON stream decoder.

pub mod error;
pub mod protocol;
pub mod settings;
pub mod store;
pub mod stream;
pub mod transport;
pub mod types;

pub use error::{ConfigError, Error, Result, TransportErrorKind};
pub use settings::{CustomHeader, Settings};
pub use store::{ObserverId, SettingsStore};
pub use stream::{StreamEvent, StreamEventStream};
pub use transport::{HttpTransport, TransportProfile};
pub use types::*;
