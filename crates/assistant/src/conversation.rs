//! Conversation state and the submit loop.
//!
//! A submit appends the user message and an empty model placeholder, then
//! grows the placeholder with each increment from the provider. Provider
//! failures turn the placeholder into the apology text; earlier messages are
//! never touched. `submit` takes `&mut self`, so two turns can never
//! interleave on the same session.

use crate::composer::RequestComposer;
use crate::knowledge::KnowledgeBase;
use providers::CompletionProvider;
use shared::chat::{Message, PersonaConfig, Role};
use shared::events::TurnEvent;
use shared::settings::AppSettings;
use shared::ChatError;
use std::sync::Arc;

/// Ordered message list. Always starts with the greeting.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::welcome(greeting)],
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Append a message and return its id
    pub fn push(&mut self, message: Message) -> String {
        let id = message.id.clone();
        self.messages.push(message);
        id
    }

    fn model_message_mut(&mut self, id: &str) -> Option<&mut Message> {
        self.messages
            .iter_mut()
            .find(|m| m.id == id && m.role == Role::Model)
    }

    /// Grow a model message. Returns false for unknown or user messages.
    pub fn append_text(&mut self, id: &str, delta: &str) -> bool {
        match self.model_message_mut(id) {
            Some(message) => {
                message.text.push_str(delta);
                true
            }
            None => false,
        }
    }

    fn replace_text(&mut self, id: &str, text: &str) -> bool {
        match self.model_message_mut(id) {
            Some(message) => {
                message.text = text.to_string();
                true
            }
            None => false,
        }
    }
}

/// How a submit ended
#[derive(Debug)]
pub enum TurnOutcome {
    /// Blank input, nothing sent
    Ignored,
    Completed { message_id: String },
    Failed { message_id: String, error: ChatError },
}

impl TurnOutcome {
    pub fn message_id(&self) -> Option<&str> {
        match self {
            TurnOutcome::Ignored => None,
            TurnOutcome::Completed { message_id } | TurnOutcome::Failed { message_id, .. } => {
                Some(message_id)
            }
        }
    }
}

/// One chat: conversation, documents, persona and the provider to ask.
pub struct ChatSession {
    provider: Arc<dyn CompletionProvider>,
    composer: RequestComposer,
    conversation: Conversation,
    knowledge: KnowledgeBase,
    persona: PersonaConfig,
    apology: String,
}

impl ChatSession {
    pub fn new(provider: Arc<dyn CompletionProvider>, settings: &AppSettings) -> Self {
        Self {
            provider,
            composer: RequestComposer::from_settings(settings),
            conversation: Conversation::new(settings.greeting.clone()),
            knowledge: KnowledgeBase::new(),
            persona: PersonaConfig::new(settings.persona.clone()),
            apology: settings.apology.clone(),
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn knowledge_mut(&mut self) -> &mut KnowledgeBase {
        &mut self.knowledge
    }

    pub fn persona(&self) -> &PersonaConfig {
        &self.persona
    }

    pub fn set_persona(&mut self, text: impl Into<String>) {
        self.persona.replace(text);
        tracing::info!(chars = self.persona.text().chars().count(), "persona updated");
    }

    /// Send `text` and stream the reply into the conversation.
    ///
    /// `on_event` runs after every change so the caller can redraw. No
    /// retries: a failure is final for this turn.
    pub async fn submit<F>(&mut self, text: &str, mut on_event: F) -> TurnOutcome
    where
        F: FnMut(&Conversation, &TurnEvent),
    {
        let text = text.trim();
        if text.is_empty() {
            return TurnOutcome::Ignored;
        }

        let user_id = self.conversation.push(Message::user(text));
        let stream = self.composer.stream(
            Arc::clone(&self.provider),
            self.conversation.messages(),
            &self.knowledge,
            &self.persona,
        );
        let placeholder_id = self.conversation.push(Message::model(""));
        on_event(
            &self.conversation,
            &TurnEvent::Started {
                user_id,
                placeholder_id: placeholder_id.clone(),
            },
        );

        let mut stream = match stream {
            Ok(stream) => stream,
            Err(error) => return self.fail(placeholder_id, error, &mut on_event),
        };

        while let Some(item) = stream.next_increment().await {
            match item {
                Ok(delta) => {
                    self.conversation.append_text(&placeholder_id, &delta);
                    on_event(
                        &self.conversation,
                        &TurnEvent::Increment {
                            message_id: placeholder_id.clone(),
                            delta,
                        },
                    );
                }
                Err(error) => return self.fail(placeholder_id, error, &mut on_event),
            }
        }

        tracing::info!(
            message_id = %placeholder_id,
            chars = self.conversation.get(&placeholder_id).map(|m| m.text.len()).unwrap_or(0),
            stop_reason = stream.stop_reason().unwrap_or("none"),
            "reply completed"
        );
        on_event(
            &self.conversation,
            &TurnEvent::Completed {
                message_id: placeholder_id.clone(),
            },
        );
        TurnOutcome::Completed {
            message_id: placeholder_id,
        }
    }

    fn fail<F>(&mut self, message_id: String, error: ChatError, on_event: &mut F) -> TurnOutcome
    where
        F: FnMut(&Conversation, &TurnEvent),
    {
        tracing::error!(message_id = %message_id, "chat error: {}", error);
        self.conversation.replace_text(&message_id, &self.apology);
        on_event(
            &self.conversation,
            &TurnEvent::Failed {
                message_id: message_id.clone(),
                error: error.to_string(),
            },
        );
        TurnOutcome::Failed { message_id, error }
    }
}
