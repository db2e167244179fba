use axum::{
    extract::{ConnectInfo, Query, State},
    response::IntoResponse,
    Json,
};
use relay_stream::{spawn_session, ChunkPolicy, TokenRelay};
use relay_types::{ChunkMode, LLMConfig};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use super::sse::sse_response;
use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

const MAX_PROMPT_CHARS: usize = 4000;
const MAX_CHUNK_SIZE: usize = 2000;

fn default_chunk_size() -> usize {
    80
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ChatQuery {
    /// Prompt text
    pub q: String,
    /// token, chars or paragraph
    pub mode: Option<String>,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatStreamRequest {
    pub prompt: String,
    /// token, chars or paragraph
    pub mode: Option<String>,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

/// Validated chat parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatParams {
    pub prompt: String,
    pub mode: ChunkMode,
    pub chunk_size: usize,
}

impl ChatParams {
    pub fn parse(prompt: String, mode: Option<&str>, chunk_size: usize) -> ApiResult<Self> {
        let prompt_chars = prompt.chars().count();
        if prompt_chars == 0 || prompt_chars > MAX_PROMPT_CHARS {
            return Err(ApiError::BadRequest(format!(
                "prompt must be between 1 and {} characters",
                MAX_PROMPT_CHARS
            )));
        }

        if !(1..=MAX_CHUNK_SIZE).contains(&chunk_size) {
            return Err(ApiError::BadRequest(format!(
                "chunk_size must be between 1 and {}",
                MAX_CHUNK_SIZE
            )));
        }

        let mode = match mode {
            Some(raw) => raw.parse::<ChunkMode>().map_err(ApiError::BadRequest)?,
            None => ChunkMode::default(),
        };

        Ok(Self {
            prompt,
            mode,
            chunk_size,
        })
    }
}

fn start_relay(
    state: &AppState,
    params: ChatParams,
    client_addr: Option<SocketAddr>,
) -> impl IntoResponse {
    let llm = &state.config.llm;
    let policy = ChunkPolicy::with_paragraph_threshold(
        params.mode,
        params.chunk_size,
        llm.paragraph_flush_threshold,
    );
    let llm_config: LLMConfig = llm.clone().into();

    let mut relay = TokenRelay::new(state.chat.clone(), &llm_config, params.prompt, policy)
        .with_preview_chars(llm.prompt_preview_length);
    if let Some(addr) = client_addr {
        relay = relay.with_client_addr(addr.ip().to_string());
    }

    sse_response(spawn_session(relay, state.session_context()))
}

/// Stream a completion for the `q` prompt
#[utoipa::path(
    get,
    path = "/chat/stream",
    params(ChatQuery),
    responses(
        (status = 200, description = "Delta events then done", content_type = "text/event-stream"),
        (status = 400, description = "Invalid prompt, mode or chunk size")
    ),
    tag = "chat"
)]
pub async fn chat_stream_get(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Query(query): Query<ChatQuery>,
) -> ApiResult<impl IntoResponse> {
    let params = ChatParams::parse(query.q, query.mode.as_deref(), query.chunk_size)?;
    Ok(start_relay(&state, params, connect_info.map(|ConnectInfo(addr)| addr)))
}

/// Stream a completion for a JSON request body
#[utoipa::path(
    post,
    path = "/chat/stream",
    request_body = ChatStreamRequest,
    responses(
        (status = 200, description = "Delta events then done", content_type = "text/event-stream"),
        (status = 400, description = "Invalid prompt, mode or chunk size")
    ),
    tag = "chat"
)]
pub async fn chat_stream_post(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Json(req): Json<ChatStreamRequest>,
) -> ApiResult<impl IntoResponse> {
    let params = ChatParams::parse(req.prompt, req.mode.as_deref(), req.chunk_size)?;
    Ok(start_relay(&state, params, connect_info.map(|ConnectInfo(addr)| addr)))
}
