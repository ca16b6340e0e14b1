pub mod chat;
pub mod error;
pub mod events;
pub mod knowledge;
pub mod session;

pub use error::ChatError;

pub mod settings {
    use serde::{Deserialize, Serialize};

    pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
    pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

    pub const DEFAULT_PERSONA: &str = "You are the official assistant of Camping Paradis. \
Your goal is to answer questions clearly, elegantly and kindly. \
Always present information in an orderly way, using lists when there are several options, \
and make sure the text is easy to read on mobile devices. \
If a specific detail is not in the files, be honest and offer the campsite's direct contact.";

    pub const DEFAULT_GREETING: &str =
        "Hello! Welcome to Camping Paradis.\n\nI'm your virtual assistant. How can I help you today?";

    pub const DEFAULT_APOLOGY: &str =
        "Sorry, something went wrong while connecting to the server.";

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct ProviderAuth {
        pub api_key: Option<String>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct ModelProvider {
        pub gemini_model: String, // e.g., "gemini-3-flash-preview"
        pub gemini_base_url: String,
        pub gemini_auth: ProviderAuth,
        /// Turn off extended internal reasoning (thinking budget 0)
        pub disable_thinking: bool,
    }

    /// Sampling temperatures used by the request composer
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct GenerationSettings {
        pub base_temperature: f32,
        /// Used instead of `base_temperature` when the user repeats a question
        pub repeat_temperature: f32,
    }

    /// Missing fields in settings.json fall back to these defaults
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct AppSettings {
        pub model: ModelProvider,
        pub generation: GenerationSettings,
        pub persona: String,
        pub greeting: String,
        /// Shown in place of a model reply when the provider fails
        pub apology: String,
    }

    impl Default for GenerationSettings {
        fn default() -> Self {
            Self {
                base_temperature: 0.6,
                repeat_temperature: 0.8,
            }
        }
    }

    impl Default for ModelProvider {
        fn default() -> Self {
            Self {
                gemini_model: DEFAULT_MODEL.into(),
                gemini_base_url: DEFAULT_BASE_URL.into(),
                gemini_auth: ProviderAuth::default(),
                disable_thinking: true,
            }
        }
    }

    impl Default for AppSettings {
        fn default() -> Self {
            Self {
                model: ModelProvider::default(),
                generation: GenerationSettings::default(),
                persona: DEFAULT_PERSONA.into(),
                greeting: DEFAULT_GREETING.into(),
                apology: DEFAULT_APOLOGY.into(),
            }
        }
    }
}

pub mod agent_api {
    use crate::chat::Role;
    use serde::{Deserialize, Serialize};

    /// One role-tagged unit submitted to the completion provider.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Turn {
        pub role: Role,
        pub text: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct GenerationConfig {
        pub temperature: f32,
        pub disable_thinking: bool,
    }

    /// Everything a provider needs for one streamed completion.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct CompletionRequest {
        pub model: String,
        pub system_instruction: String,
        pub turns: Vec<Turn>,
        pub generation: GenerationConfig,
    }

    /// Items pushed by a provider through its stream channel.
    #[derive(Debug, Clone, PartialEq)]
    pub enum StreamChunk {
        /// Incremental text delta; may be empty
        Text(String),
        Done { stop_reason: Option<String> },
        Error(String),
    }
}

#[cfg(test)]
mod tests {
    use super::settings::*;

    #[test]
    fn test_partial_settings_use_defaults() {
        let json = r#"{"model":{"gemini_model":"gemini-2.5-flash"},"apology":"Oops"}"#;
        let settings: AppSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.model.gemini_model, "gemini-2.5-flash");
        assert_eq!(settings.model.gemini_base_url, DEFAULT_BASE_URL);
        assert!(settings.model.disable_thinking);
        assert_eq!(settings.generation.repeat_temperature, 0.8);
        assert_eq!(settings.apology, "Oops");
        assert_eq!(settings.persona, DEFAULT_PERSONA);
    }
}
