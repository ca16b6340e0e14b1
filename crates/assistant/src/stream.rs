//! Pull-based reply stream.
//!
//! The provider runs as a producer task pushing `StreamChunk`s into a
//! channel; `TurnStream` is the consumer. States:
//!
//! ```text
//! Idle --first pull--> Streaming --Done--> Completed
//!                          |------Error--> Failed
//!                          `---cancel()--> Cancelled
//! ```
//!
//! The producer is only spawned on the first pull. Each `TurnStream` is
//! single-use: once terminal it yields `None` forever.

use futures::Stream;
use providers::CompletionProvider;
use shared::agent_api::{CompletionRequest, StreamChunk};
use shared::ChatError;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Streaming,
    Completed,
    Failed,
    Cancelled,
}

impl StreamState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamState::Completed | StreamState::Failed | StreamState::Cancelled
        )
    }
}

pub struct TurnStream {
    provider: Arc<dyn CompletionProvider>,
    request: Option<CompletionRequest>,
    state: StreamState,
    rx: Option<UnboundedReceiver<StreamChunk>>,
    producer: Option<JoinHandle<()>>,
    stop_reason: Option<String>,
}

impl TurnStream {
    pub fn new(provider: Arc<dyn CompletionProvider>, request: CompletionRequest) -> Self {
        Self {
            provider,
            request: Some(request),
            state: StreamState::Idle,
            rx: None,
            producer: None,
            stop_reason: None,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Finish reason reported by the provider, once completed
    pub fn stop_reason(&self) -> Option<&str> {
        self.stop_reason.as_deref()
    }

    fn start(&mut self) {
        let Some(request) = self.request.take() else {
            return;
        };
        let (tx, rx) = mpsc::unbounded_channel();
        let provider = Arc::clone(&self.provider);

        self.producer = Some(tokio::spawn(async move {
            match provider.generate_stream(request, tx.clone()).await {
                // A duplicate Done after the provider's own is never read
                Ok(()) => {
                    let _ = tx.send(StreamChunk::Done { stop_reason: None });
                }
                Err(e) => {
                    let _ = tx.send(StreamChunk::Error(format!("{:#}", e)));
                }
            }
        }));
        self.rx = Some(rx);
        self.state = StreamState::Streaming;
    }

    fn finish(&mut self, state: StreamState) {
        self.state = state;
        self.rx = None;
        self.producer = None;
    }

    /// Wait for the next text increment.
    ///
    /// `Some(Ok(delta))` for each non-empty delta, one `Some(Err(..))` if the
    /// provider fails, then `None`.
    pub async fn next_increment(&mut self) -> Option<Result<String, ChatError>> {
        if self.state == StreamState::Idle {
            self.start();
        }

        loop {
            let rx = self.rx.as_mut()?;
            match rx.recv().await {
                Some(StreamChunk::Text(text)) => {
                    if text.is_empty() {
                        continue;
                    }
                    return Some(Ok(text));
                }
                Some(StreamChunk::Done { stop_reason }) => {
                    self.stop_reason = stop_reason;
                    self.finish(StreamState::Completed);
                    return None;
                }
                Some(StreamChunk::Error(message)) => {
                    let provider = self.provider.name().to_string();
                    self.finish(StreamState::Failed);
                    return Some(Err(ChatError::provider(provider, message)));
                }
                None => {
                    // Producer went away without a terminal chunk (panicked)
                    let provider = self.provider.name().to_string();
                    self.finish(StreamState::Failed);
                    return Some(Err(ChatError::provider(
                        provider,
                        "stream closed unexpectedly",
                    )));
                }
            }
        }
    }

    /// Stop the producer. Increments already handed out stay delivered.
    pub fn cancel(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
        self.request = None;
        self.finish(StreamState::Cancelled);
    }

    /// Adapt into a `futures::Stream` of increments.
    pub fn into_stream(self) -> impl Stream<Item = Result<String, ChatError>> + Send {
        futures::stream::unfold(self, |mut turn| async move {
            turn.next_increment().await.map(|item| (item, turn))
        })
    }
}
