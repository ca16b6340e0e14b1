//! Conversation core for the concierge chat.
//!
//! - `repetition`: spots a user asking the same thing twice
//! - `knowledge`: uploaded plain-text documents and their ingestion
//! - `composer`: shapes the provider request and opens the reply stream
//! - `stream`: pull-based state machine over the provider's chunks
//! - `conversation`: message list plus the submit/stream/finalize loop
//! - `admin`: the cosmetic unlock for the configuration panel

pub mod admin;
pub mod composer;
pub mod conversation;
pub mod knowledge;
pub mod repetition;
pub mod stream;

#[cfg(test)]
mod testing;

pub use admin::{resolve_unlock, AdminPanel, UnlockOutcome};
pub use composer::RequestComposer;
pub use conversation::{ChatSession, Conversation, TurnOutcome};
pub use knowledge::{IngestReport, KnowledgeBase};
pub use repetition::is_repeating;
pub use stream::{StreamState, TurnStream};
