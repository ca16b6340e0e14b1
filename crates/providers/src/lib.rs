pub mod gemini;
pub mod sse;

use anyhow::Result;
use async_trait::async_trait;
use shared::agent_api::{CompletionRequest, StreamChunk};
use tokio::sync::mpsc::UnboundedSender;

pub use gemini::GeminiClient;

/// A hosted model that can stream a completion.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Stream one completion into `tx`.
    ///
    /// Contract: if the request fails *before* any chunk is sent, returns
    /// `Err(...)`. Once streaming starts, failures go through
    /// `StreamChunk::Error` and the method returns `Ok(())`. A successful
    /// stream ends with `StreamChunk::Done`.
    async fn generate_stream(
        &self,
        request: CompletionRequest,
        tx: UnboundedSender<StreamChunk>,
    ) -> Result<()>;
}
