//! In-memory provider for unit tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use providers::CompletionProvider;
use shared::agent_api::{CompletionRequest, GenerationConfig, StreamChunk, Turn};
use shared::chat::Role;
use tokio::sync::mpsc::UnboundedSender;

/// Replays a fixed chunk script and records every request it receives.
pub struct ScriptedProvider {
    script: Vec<StreamChunk>,
    fail_before_stream: Option<String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<StreamChunk>) -> Self {
        Self {
            script,
            fail_before_stream: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Text chunks followed by a `STOP` finish
    pub fn texts(texts: &[&str]) -> Self {
        let mut script: Vec<StreamChunk> = texts
            .iter()
            .map(|t| StreamChunk::Text(t.to_string()))
            .collect();
        script.push(StreamChunk::Done {
            stop_reason: Some("STOP".into()),
        });
        Self::new(script)
    }

    /// Rejects the request before any chunk is sent
    pub fn failing(message: &str) -> Self {
        Self {
            fail_before_stream: Some(message.to_string()),
            ..Self::new(Vec::new())
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate_stream(
        &self,
        request: CompletionRequest,
        tx: UnboundedSender<StreamChunk>,
    ) -> Result<()> {
        self.requests.lock().push(request);
        if let Some(message) = &self.fail_before_stream {
            return Err(anyhow!("{}", message));
        }
        for chunk in &self.script {
            let _ = tx.send(chunk.clone());
            tokio::task::yield_now().await;
        }
        Ok(())
    }
}

pub fn sample_request() -> CompletionRequest {
    CompletionRequest {
        model: "test-model".into(),
        system_instruction: "Be brief.".into(),
        turns: vec![Turn {
            role: Role::User,
            text: "Hola".into(),
        }],
        generation: GenerationConfig {
            temperature: 0.6,
            disable_thinking: true,
        },
    }
}
