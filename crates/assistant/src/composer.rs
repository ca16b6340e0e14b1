//! Builds the provider request for one reply: persona, formatting rules,
//! anti-repetition notice, document context and the conversation turns.

use crate::knowledge::KnowledgeBase;
use crate::repetition::is_repeating;
use crate::stream::TurnStream;
use providers::CompletionProvider;
use shared::agent_api::{CompletionRequest, GenerationConfig, Turn};
use shared::chat::{Message, PersonaConfig, Role};
use shared::settings::{AppSettings, GenerationSettings};
use shared::ChatError;
use std::sync::Arc;

/// Used when the persona is blank
pub const FALLBACK_PERSONA: &str = "Camping assistant.";

pub const FORMATTING_RULES: &str = "RULES: Short sentences. Double line break between paragraphs. \
At most 2 emojis. Reply in the user's language.";

pub const ANTI_REPETITION_NOTICE: &str = "NOTICE: The user is repeating their question. \
Do NOT repeat your previous answer. Be more concise, offer a different angle \
or ask which specific detail is still unclear.";

#[derive(Debug, Clone)]
pub struct RequestComposer {
    model: String,
    generation: GenerationSettings,
    disable_thinking: bool,
}

impl RequestComposer {
    pub fn new(model: impl Into<String>, generation: GenerationSettings, disable_thinking: bool) -> Self {
        Self {
            model: model.into(),
            generation,
            disable_thinking,
        }
    }

    pub fn from_settings(settings: &AppSettings) -> Self {
        Self::new(
            settings.model.gemini_model.clone(),
            settings.generation.clone(),
            settings.model.disable_thinking,
        )
    }

    /// Shape the request for replying to `messages`.
    ///
    /// Fails with `NoUserTurn` when the history holds no user message.
    pub fn compose(
        &self,
        messages: &[Message],
        knowledge: &KnowledgeBase,
        persona: &PersonaConfig,
    ) -> Result<CompletionRequest, ChatError> {
        let turns = conversation_turns(messages)?;
        let repeating = is_repeating(messages);
        let temperature = if repeating {
            self.generation.repeat_temperature
        } else {
            self.generation.base_temperature
        };

        tracing::debug!(
            turns = turns.len(),
            documents = knowledge.len(),
            repeating,
            temperature,
            "composed completion request"
        );

        Ok(CompletionRequest {
            model: self.model.clone(),
            system_instruction: system_instruction(
                persona,
                repeating,
                knowledge.context_block().as_deref(),
            ),
            turns,
            generation: GenerationConfig {
                temperature,
                disable_thinking: self.disable_thinking,
            },
        })
    }

    /// Compose the request and hand back a lazy stream of reply increments.
    /// Nothing is sent until the stream is first pulled.
    pub fn stream(
        &self,
        provider: Arc<dyn CompletionProvider>,
        messages: &[Message],
        knowledge: &KnowledgeBase,
        persona: &PersonaConfig,
    ) -> Result<TurnStream, ChatError> {
        let request = self.compose(messages, knowledge, persona)?;
        Ok(TurnStream::new(provider, request))
    }
}

/// Map messages to provider turns. Leading model messages (the greeting)
/// are dropped because the first turn must come from the user.
pub fn conversation_turns(messages: &[Message]) -> Result<Vec<Turn>, ChatError> {
    let turns: Vec<Turn> = messages
        .iter()
        .skip_while(|m| m.role == Role::Model)
        .map(|m| Turn {
            role: m.role,
            text: m.text.clone(),
        })
        .collect();

    if turns.is_empty() {
        return Err(ChatError::NoUserTurn);
    }
    Ok(turns)
}

pub fn system_instruction(
    persona: &PersonaConfig,
    repeating: bool,
    context_block: Option<&str>,
) -> String {
    let persona = if persona.is_blank() {
        FALLBACK_PERSONA
    } else {
        persona.text().trim()
    };

    let mut rules = FORMATTING_RULES.to_string();
    if repeating {
        rules.push(' ');
        rules.push_str(ANTI_REPETITION_NOTICE);
    }

    let mut sections = vec![persona.to_string(), rules];
    if let Some(block) = context_block {
        sections.push(block.to_string());
    }
    sections.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::knowledge::KnowledgeDocument;

    fn composer() -> RequestComposer {
        RequestComposer::new("gemini-3-flash-preview", GenerationSettings::default(), true)
    }

    #[test]
    fn test_greeting_is_not_sent() {
        let messages = vec![Message::welcome("Hello!"), Message::user("Is there a pool?")];
        let turns = conversation_turns(&messages).unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].text, "Is there a pool?");
    }

    #[test]
    fn test_later_model_turns_are_kept() {
        let messages = vec![
            Message::welcome("Hello!"),
            Message::user("Is there a pool?"),
            Message::model("Yes, open 10:00-20:00."),
            Message::user("Is it heated?"),
        ];
        let roles: Vec<Role> = conversation_turns(&messages)
            .unwrap()
            .iter()
            .map(|t| t.role)
            .collect();
        assert_eq!(roles, vec![Role::User, Role::Model, Role::User]);
    }

    #[test]
    fn test_model_only_history_is_rejected() {
        let messages = vec![Message::welcome("Hello!"), Message::model("Anything else?")];
        let err = composer()
            .compose(&messages, &KnowledgeBase::new(), &PersonaConfig::default())
            .unwrap_err();
        assert!(matches!(err, ChatError::NoUserTurn));
        assert!(matches!(conversation_turns(&[]), Err(ChatError::NoUserTurn)));
    }

    #[test]
    fn test_blank_persona_falls_back() {
        let instruction = system_instruction(&PersonaConfig::new("  "), false, None);
        assert!(instruction.starts_with(FALLBACK_PERSONA));
        assert!(instruction.contains(FORMATTING_RULES));
        assert!(!instruction.contains(ANTI_REPETITION_NOTICE));
    }

    #[test]
    fn test_baseline_request() {
        let messages = vec![Message::welcome("Hello!"), Message::user("Dogs allowed?")];
        let persona = PersonaConfig::new("You are the campsite concierge.");
        let request = composer()
            .compose(&messages, &KnowledgeBase::new(), &persona)
            .unwrap();

        assert_eq!(request.model, "gemini-3-flash-preview");
        assert_eq!(request.generation.temperature, 0.6);
        assert!(request.generation.disable_thinking);
        assert!(request
            .system_instruction
            .starts_with("You are the campsite concierge."));
        assert!(!request.system_instruction.contains("CAMPSITE DATA"));
    }

    #[test]
    fn test_repetition_raises_temperature_and_adds_notice() {
        let messages = vec![
            Message::welcome("Hello!"),
            Message::user("what time is check in"),
            Message::model("From 14:00."),
            Message::user("what time is check in please"),
        ];
        let request = composer()
            .compose(&messages, &KnowledgeBase::new(), &PersonaConfig::default())
            .unwrap();
        assert_eq!(request.generation.temperature, 0.8);
        assert!(request.system_instruction.contains(ANTI_REPETITION_NOTICE));
    }

    #[test]
    fn test_documents_are_injected() {
        let mut kb = KnowledgeBase::new();
        kb.add(KnowledgeDocument::new("prices.txt", "Pitch: 30 EUR", 13));
        kb.add(KnowledgeDocument::new("rules.txt", "No fires", 8));
        let messages = vec![Message::user("How much is a pitch?")];

        let request = composer()
            .compose(&messages, &kb, &PersonaConfig::default())
            .unwrap();
        let instruction = &request.system_instruction;
        assert!(instruction.ends_with("CAMPSITE DATA:\n[prices.txt]: Pitch: 30 EUR\n[rules.txt]: No fires"));
    }
}
