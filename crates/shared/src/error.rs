//! Error taxonomy shared by the provider, assistant and app crates.

/// Failures surfaced by the chat pipeline
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// No API credential in settings or environment. Fatal.
    #[error("No API key configured: set GEMINI_API_KEY (or API_KEY) or add one to settings")]
    MissingCredential,

    #[error("Provider {provider} failed: {message}")]
    Provider { provider: String, message: String },

    /// The history holds no user-authored message to answer
    #[error("Conversation has no user message to send")]
    NoUserTurn,

    #[error("The file {name} is not supported. Upload .txt files only.")]
    UnsupportedFile { name: String },

    #[error("Failed to read {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl ChatError {
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        ChatError::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Configuration errors stop the app; everything else is per-operation
    pub fn is_fatal(&self) -> bool {
        matches!(self, ChatError::MissingCredential)
    }
}
