use async_trait::async_trait;
use futures::StreamExt;
use relay_llm::{ChatClient, ChatOptions, ChatRequest, StreamEvent as UpstreamEvent};
use relay_types::{EventPayload, LLMConfig};
use std::sync::Arc;

use crate::chunking::{ChunkPolicy, Chunker};
use crate::error::SessionError;
use crate::session::Session;
use crate::sink::EventSink;

const MISSING_KEY: &str = "OPENAI_API_KEY is not set";
const DEFAULT_PREVIEW_CHARS: usize = 50;

/// First `max_chars` of `prompt` on one line, for log output
pub fn prompt_preview(prompt: &str, max_chars: usize) -> String {
    let mut preview: String = prompt
        .chars()
        .take(max_chars)
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    if prompt.chars().count() > max_chars {
        preview.push_str("...");
    }
    preview
}

/// Relays a streaming completion to the client, re-chunked per a [`ChunkPolicy`]
///
/// Emits `delta` events followed by a single `done`. Upstream failures end the session after
/// one `error` event; cancellation ends it silently.
pub struct TokenRelay {
    client: Option<Arc<dyn ChatClient>>,
    request: ChatRequest,
    policy: ChunkPolicy,
    client_addr: Option<String>,
    preview_chars: usize,
}

impl TokenRelay {
    /// `client` is `None` when no API key is configured
    pub fn new(
        client: Option<Arc<dyn ChatClient>>,
        config: &LLMConfig,
        prompt: impl Into<String>,
        policy: ChunkPolicy,
    ) -> Self {
        let mut options = ChatOptions::new();
        if let Some(temperature) = config.temperature {
            options = options.temperature(temperature);
        }
        if let Some(max_tokens) = config.max_tokens {
            options = options.max_tokens(max_tokens);
        }

        Self {
            client,
            request: ChatRequest::prompt(&config.model, &config.system_prompt, prompt)
                .with_options(options),
            policy,
            client_addr: None,
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }

    pub fn with_client_addr(mut self, addr: impl Into<String>) -> Self {
        self.client_addr = Some(addr.into());
        self
    }

    pub fn with_preview_chars(mut self, max_chars: usize) -> Self {
        self.preview_chars = max_chars;
        self
    }

    fn prompt(&self) -> &str {
        self.request
            .messages
            .last()
            .map(|m| m.content())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Session for TokenRelay {
    fn kind(&self) -> &'static str {
        "chat"
    }

    async fn run(&mut self, sink: &mut EventSink) -> Result<(), SessionError> {
        let Some(client) = self.client.clone() else {
            sink.emit_error(MISSING_KEY).await?;
            return Err(SessionError::Precondition(MISSING_KEY.to_string()));
        };

        tracing::info!(
            request_id = %sink.request_id(),
            model = %self.request.model,
            mode = %self.policy.mode,
            chunk_size = self.policy.chunk_size,
            client = self.client_addr.as_deref().unwrap_or("-"),
            prompt = %prompt_preview(self.prompt(), self.preview_chars),
            "Relaying completion"
        );

        let opened = sink.guard(client.chat_stream(self.request.clone())).await?;
        let mut upstream = match opened {
            Ok(stream) => stream,
            Err(e) => {
                sink.emit_error(&e).await?;
                return Err(SessionError::Upstream(e.to_string()));
            }
        };

        let mut chunker = Chunker::new(self.policy);

        while let Some(item) = sink.guard(upstream.next()).await? {
            match item {
                Ok(UpstreamEvent::Message { content }) => {
                    if !content.is_empty() {
                        sink.metrics_mut().record_first_token();
                    }
                    if let Some(chunk) = chunker.push(&content) {
                        sink.emit(EventPayload::Delta { delta: chunk }).await?;
                    }
                }
                Ok(UpstreamEvent::Done { finish_reason }) => {
                    tracing::debug!(
                        request_id = %sink.request_id(),
                        finish_reason = finish_reason.as_deref().unwrap_or("-"),
                        "Upstream finished"
                    );
                }
                Err(e) => {
                    sink.emit_error(&e).await?;
                    return Err(SessionError::Upstream(e.to_string()));
                }
            }
        }

        if let Some(rest) = chunker.finish() {
            sink.emit(EventPayload::Delta { delta: rest }).await?;
        }
        sink.emit(EventPayload::Done).await?;
        Ok(())
    }
}
