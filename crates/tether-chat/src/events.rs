//! Chat event types broadcast to the host

use serde::{Deserialize, Serialize};
use tether_ai::Usage;

/// Whether a turn is part of the conversation or a one-shot analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    Chat,
    Analysis,
}

/// Events emitted while the client runs turns
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// Request is about to be sent
    TurnStart { kind: TurnKind },

    /// A content chunk arrived
    Chunk { kind: TurnKind, text: String },

    /// Stream ended
    TurnEnd {
        kind: TurnKind,
        text: String,
        usage: Option<Usage>,
        /// Whether the exchange was added to history
        recorded: bool,
    },

    /// Turn failed; history is unchanged
    Error { kind: TurnKind, message: String },

    /// History was cleared
    HistoryCleared,
}

impl ChatEvent {
    /// Check if this event ends a turn
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChatEvent::TurnEnd { .. } | ChatEvent::Error { .. })
    }
}
