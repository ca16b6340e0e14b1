use crate::sse::SseParser;
use crate::CompletionProvider;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::agent_api::{CompletionRequest, StreamChunk};
use shared::settings::{ModelProvider, ProviderAuth};
use shared::ChatError;
use std::env;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use url::Url;

/// Environment variables checked, in order, when settings carry no key
const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

// ── Request types ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    system_instruction: GeminiContent,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

// ── Streaming response types ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiStreamResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    error: Option<GeminiApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiCandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidatePart {
    #[serde(default)]
    text: Option<String>,
    /// Reasoning summaries are never shown to the user
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
struct GeminiApiError {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    status: Option<String>,
    message: String,
}

/// One decoded SSE payload
#[derive(Debug, Default, PartialEq)]
struct StreamDelta {
    text: String,
    finish_reason: Option<String>,
}

// ── Conversion ───────────────────────────────────────────────────────

fn to_gemini_request(request: CompletionRequest) -> GeminiRequest {
    let contents = request
        .turns
        .into_iter()
        .map(|turn| GeminiContent {
            role: Some(turn.role.as_str().to_string()),
            parts: vec![GeminiPart { text: turn.text }],
        })
        .collect();

    GeminiRequest {
        contents,
        system_instruction: GeminiContent {
            role: None,
            parts: vec![GeminiPart {
                text: request.system_instruction,
            }],
        },
        generation_config: GeminiGenerationConfig {
            temperature: request.generation.temperature,
            thinking_config: request
                .generation
                .disable_thinking
                .then_some(ThinkingConfig { thinking_budget: 0 }),
        },
    }
}

fn decode_event(data: &str) -> Result<StreamDelta> {
    let resp: GeminiStreamResponse = serde_json::from_str(data)
        .with_context(|| format!("malformed gemini chunk: {}", truncate(data, 200)))?;

    if let Some(err) = resp.error {
        let code = err.code.map(|c| c.to_string()).unwrap_or_default();
        let status = err.status.unwrap_or_default();
        return Err(anyhow!("gemini error: {} {} {}", code, status, err.message));
    }

    let mut delta = StreamDelta::default();
    if let Some(candidate) = resp.candidates.into_iter().next() {
        delta.finish_reason = candidate.finish_reason;
        if let Some(content) = candidate.content {
            for part in content.parts {
                if part.thought {
                    continue;
                }
                if let Some(text) = part.text {
                    delta.text.push_str(&text);
                }
            }
        }
    }
    Ok(delta)
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    } else {
        s.to_string()
    }
}

/// Pick the API key from settings, then the environment.
pub fn resolve_api_key(
    auth: &ProviderAuth,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, ChatError> {
    auth.api_key
        .iter()
        .cloned()
        .chain(API_KEY_VARS.iter().filter_map(|var| lookup(var)))
        .map(|key| key.trim().to_string())
        .find(|key| !key.is_empty())
        .ok_or(ChatError::MissingCredential)
}

// ── Client ───────────────────────────────────────────────────────────

pub struct GeminiClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    /// Fails with `MissingCredential` before any network activity when no
    /// key can be found.
    pub fn from_settings(settings: &ModelProvider) -> Result<Self, ChatError> {
        Self::from_settings_with(settings, |var| env::var(var).ok())
    }

    fn from_settings_with(
        settings: &ModelProvider,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ChatError> {
        let api_key = resolve_api_key(&settings.gemini_auth, lookup)?;
        Self::with_key(api_key, &settings.gemini_base_url)
            .map_err(|e| ChatError::provider("gemini", format!("{:#}", e)))
    }

    pub fn with_key(api_key: impl Into<String>, base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()
            .context("building http client")?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn stream_url(&self, model: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("invalid gemini base url: {}", self.base_url))?;
        let method = format!("{}:streamGenerateContent", model);
        url.path_segments_mut()
            .map_err(|_| anyhow!("gemini base url cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .extend(["v1beta", "models", method.as_str()]);
        url.query_pairs_mut().append_pair("alt", "sse");
        Ok(url)
    }
}

#[async_trait]
impl CompletionProvider for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate_stream(
        &self,
        request: CompletionRequest,
        tx: UnboundedSender<StreamChunk>,
    ) -> Result<()> {
        let url = self.stream_url(&request.model)?;
        tracing::debug!(
            model = %request.model,
            turns = request.turns.len(),
            temperature = request.generation.temperature,
            "gemini stream request"
        );
        let body = to_gemini_request(request);

        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            let detail = truncate(body.trim(), 800);
            if detail.is_empty() {
                return Err(anyhow!("gemini error: {}", status));
            }
            return Err(anyhow!("gemini error: {}\n{}", status, detail));
        }

        let mut parser = SseParser::new();
        let mut stream = resp.bytes_stream();
        let mut stop_reason = None;

        while let Some(chunk) = stream.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    let _ = tx.send(StreamChunk::Error(format!("stream read error: {}", e)));
                    return Ok(());
                }
            };
            for event in parser.feed(&bytes) {
                match decode_event(&event.data) {
                    Ok(delta) => {
                        if !delta.text.is_empty() {
                            let _ = tx.send(StreamChunk::Text(delta.text));
                        }
                        if delta.finish_reason.is_some() {
                            stop_reason = delta.finish_reason;
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(StreamChunk::Error(e.to_string()));
                        return Ok(());
                    }
                }
            }
        }

        if let Some(event) = parser.finish() {
            match decode_event(&event.data) {
                Ok(delta) => {
                    if !delta.text.is_empty() {
                        let _ = tx.send(StreamChunk::Text(delta.text));
                    }
                    stop_reason = delta.finish_reason.or(stop_reason);
                }
                Err(e) => {
                    let _ = tx.send(StreamChunk::Error(e.to_string()));
                    return Ok(());
                }
            }
        }

        let _ = tx.send(StreamChunk::Done { stop_reason });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::agent_api::{GenerationConfig, Turn};
    use shared::chat::Role;

    fn sample_request(disable_thinking: bool) -> CompletionRequest {
        CompletionRequest {
            model: "gemini-3-flash-preview".into(),
            system_instruction: "Be brief.".into(),
            turns: vec![
                Turn {
                    role: Role::User,
                    text: "Hola".into(),
                },
                Turn {
                    role: Role::Model,
                    text: "¡Hola!".into(),
                },
            ],
            generation: GenerationConfig {
                temperature: 0.6,
                disable_thinking,
            },
        }
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(to_gemini_request(sample_request(true))).unwrap();
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][1]["parts"][0]["text"], "¡Hola!");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be brief.");
        assert!(body["systemInstruction"].get("role").is_none());
        assert_eq!(
            body["generationConfig"]["thinkingConfig"]["thinkingBudget"],
            0
        );
    }

    #[test]
    fn test_thinking_config_omitted_when_enabled() {
        let body = serde_json::to_value(to_gemini_request(sample_request(false))).unwrap();
        assert!(body["generationConfig"].get("thinkingConfig").is_none());
    }

    #[test]
    fn test_decode_text_chunk() {
        let data = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hola"},{"text":" mundo"}]}}]}"#;
        let delta = decode_event(data).unwrap();
        assert_eq!(delta.text, "Hola mundo");
        assert_eq!(delta.finish_reason, None);
    }

    #[test]
    fn test_decode_skips_thoughts_and_empty_chunks() {
        let data = r#"{"candidates":[{"content":{"parts":[{"text":"plan","thought":true}]},"finishReason":"STOP"}]}"#;
        let delta = decode_event(data).unwrap();
        assert_eq!(delta.text, "");
        assert_eq!(delta.finish_reason.as_deref(), Some("STOP"));

        let usage_only = r#"{"usageMetadata":{"totalTokenCount":12}}"#;
        assert_eq!(decode_event(usage_only).unwrap(), StreamDelta::default());
    }

    #[test]
    fn test_decode_error_payload() {
        let data = r#"{"error":{"code":429,"status":"RESOURCE_EXHAUSTED","message":"Quota exceeded"}}"#;
        let err = decode_event(data).unwrap_err().to_string();
        assert!(err.contains("429"));
        assert!(err.contains("Quota exceeded"));
    }

    #[test]
    fn test_decode_malformed_chunk() {
        assert!(decode_event("not json").is_err());
    }

    #[test]
    fn test_resolve_api_key_order() {
        let auth = ProviderAuth {
            api_key: Some("from-settings".into()),
        };
        let key = resolve_api_key(&auth, |_| Some("from-env".into())).unwrap();
        assert_eq!(key, "from-settings");

        let key = resolve_api_key(&ProviderAuth::default(), |var| {
            (var == "API_KEY").then(|| "fallback".to_string())
        })
        .unwrap();
        assert_eq!(key, "fallback");
    }

    #[test]
    fn test_missing_api_key() {
        let auth = ProviderAuth {
            api_key: Some("  ".into()),
        };
        let err = resolve_api_key(&auth, |_| None).unwrap_err();
        assert!(matches!(err, ChatError::MissingCredential));
    }

    #[test]
    fn test_stream_url() {
        let client =
            GeminiClient::with_key("k", "https://generativelanguage.googleapis.com/").unwrap();
        let url = client.stream_url("gemini-3-flash-preview").unwrap();
        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-3-flash-preview:streamGenerateContent?alt=sse"
        );
    }

    #[test]
    fn test_from_settings_builds_client() {
        let settings = ModelProvider {
            gemini_auth: ProviderAuth {
                api_key: Some("from-settings".into()),
            },
            ..ModelProvider::default()
        };
        let client = GeminiClient::from_settings_with(&settings, |_| None).unwrap();
        assert_eq!(client.api_key, "from-settings");
        assert_eq!(client.base_url, "https://generativelanguage.googleapis.com");

        let err = GeminiClient::from_settings_with(&ModelProvider::default(), |_| None)
            .err()
            .unwrap();
        assert!(matches!(err, ChatError::MissingCredential));
    }
}
