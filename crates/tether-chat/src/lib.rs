//! tether-chat: streaming chat client
//!
//! This crate wraps the protocol layer with conversation memory, the HTTP
//! exchange analysis prompt, and a transport that follows settings changes.

pub mod analysis;
pub mod client;
pub mod conversation;
pub mod error;
pub mod events;

#[cfg(test)]
mod mock_server;

pub use analysis::{Exchange, format_prompt};
pub use client::ChatClient;
pub use conversation::History;
pub use error::{Error, Result};
pub use events::{ChatEvent, TurnKind};
