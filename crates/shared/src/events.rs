//! Events emitted while a conversation turn progresses.
//!
//! The front-end receives one of these after every state change so it can
//! redraw the transcript.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TurnEvent {
    /// User message and empty model placeholder were appended
    Started {
        user_id: String,
        placeholder_id: String,
    },
    /// A text delta was appended to the placeholder
    Increment { message_id: String, delta: String },
    Completed { message_id: String },
    /// Placeholder text was replaced with the apology
    Failed { message_id: String, error: String },
}

impl TurnEvent {
    /// Id of the model message this event concerns
    pub fn message_id(&self) -> &str {
        match self {
            TurnEvent::Started { placeholder_id, .. } => placeholder_id,
            TurnEvent::Increment { message_id, .. } => message_id,
            TurnEvent::Completed { message_id } => message_id,
            TurnEvent::Failed { message_id, .. } => message_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnEvent::Completed { .. } | TurnEvent::Failed { .. })
    }
}
