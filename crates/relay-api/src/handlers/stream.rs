use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use relay_stream::{
    spawn_session, DbClockStep, GeneratorStep, OrderChangeStep, PollLoop, PubSubStep,
    TelemetryStep, UnavailableSession,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use super::sse::sse_response;
use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

pub const DATABASE_UNAVAILABLE: &str = "Database is not configured (DATABASE_URL is not set)";
pub const BUS_UNAVAILABLE: &str = "Message bus is not configured (REDIS_URL is not set)";

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrdersStreamRequest {
    /// Size of the tracked window, 1..=500
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Seconds between polls, 0.2..=30
    #[serde(default = "default_poll_interval")]
    pub poll_interval: f64,
}

fn default_limit() -> u32 {
    50
}

fn default_poll_interval() -> f64 {
    2.0
}

impl Default for OrdersStreamRequest {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            poll_interval: default_poll_interval(),
        }
    }
}

impl OrdersStreamRequest {
    pub fn validate(&self) -> ApiResult<()> {
        if !(1..=500).contains(&self.limit) {
            return Err(ApiError::BadRequest(
                "limit must be between 1 and 500".to_string(),
            ));
        }
        if !(0.2..=30.0).contains(&self.poll_interval) {
            return Err(ApiError::BadRequest(
                "poll_interval must be between 0.2 and 30 seconds".to_string(),
            ));
        }
        Ok(())
    }
}

/// Synthetic stream: `counter`, `timestamp` or `custom`
#[utoipa::path(
    get,
    path = "/stream/{stream_type}",
    params(("stream_type" = String, Path, description = "counter, timestamp or custom")),
    responses(
        (status = 200, description = "Event stream", content_type = "text/event-stream")
    ),
    tag = "streams"
)]
pub async fn generic_stream(
    State(state): State<Arc<AppState>>,
    Path(stream_type): Path<String>,
) -> impl IntoResponse {
    let streams = &state.config.streams;
    let session = PollLoop::new(
        GeneratorStep::new(&stream_type),
        streams.poll(streams.generic_interval_secs),
    );

    sse_response(spawn_session(session, state.session_context()))
}

/// Database clock, sampled on the configured interval
#[utoipa::path(
    post,
    path = "/stream/database",
    responses(
        (status = 200, description = "Event stream", content_type = "text/event-stream")
    ),
    tag = "streams"
)]
pub async fn database_stream(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let ctx = state.session_context();
    let streams = &state.config.streams;

    let stream = match state.store.clone() {
        Some(store) => spawn_session(
            PollLoop::new(
                DbClockStep::new(store),
                streams.poll(streams.database_poll_interval_secs),
            ),
            ctx,
        ),
        None => spawn_session(UnavailableSession::new("database", DATABASE_UNAVAILABLE), ctx),
    };

    sse_response(stream)
}

/// Database clock plus object count and query latency
#[utoipa::path(
    post,
    path = "/stream/database/telemetry",
    responses(
        (status = 200, description = "Event stream", content_type = "text/event-stream")
    ),
    tag = "streams"
)]
pub async fn telemetry_stream(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let ctx = state.session_context();
    let streams = &state.config.streams;

    let stream = match state.store.clone() {
        Some(store) => spawn_session(
            PollLoop::new(
                TelemetryStep::new(store),
                streams.poll(streams.database_poll_interval_secs),
            ),
            ctx,
        ),
        None => spawn_session(UnavailableSession::new("telemetry", DATABASE_UNAVAILABLE), ctx),
    };

    sse_response(stream)
}

/// New orders and status changes within the latest `limit` orders
#[utoipa::path(
    post,
    path = "/stream/orders/changes",
    request_body = OrdersStreamRequest,
    responses(
        (status = 200, description = "Event stream", content_type = "text/event-stream"),
        (status = 400, description = "Invalid limit or poll interval")
    ),
    tag = "streams"
)]
pub async fn order_changes_stream(
    State(state): State<Arc<AppState>>,
    body: Option<Json<OrdersStreamRequest>>,
) -> ApiResult<impl IntoResponse> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    req.validate()?;

    let ctx = state.session_context();
    let stream = match state.store.clone() {
        Some(store) => {
            let config = state
                .config
                .streams
                .poll(req.poll_interval)
                .with_heartbeat(state.config.streams.heartbeat_interval());
            spawn_session(
                PollLoop::new(OrderChangeStep::new(store, req.limit), config),
                ctx,
            )
        }
        None => spawn_session(UnavailableSession::new("orders", DATABASE_UNAVAILABLE), ctx),
    };

    Ok(sse_response(stream))
}

/// Messages published on `channel`
#[utoipa::path(
    get,
    path = "/stream/pubsub/{channel}",
    params(("channel" = String, Path, description = "Channel to subscribe to")),
    responses(
        (status = 200, description = "Event stream", content_type = "text/event-stream")
    ),
    tag = "streams"
)]
pub async fn pubsub_stream(
    State(state): State<Arc<AppState>>,
    Path(channel): Path<String>,
) -> impl IntoResponse {
    let ctx = state.session_context();
    let streams = &state.config.streams;

    let stream = match state.bus.clone() {
        Some(bus) => spawn_session(
            PollLoop::new(
                PubSubStep::new(bus, channel, streams.pubsub_receive_timeout()),
                streams.poll(streams.pubsub_poll_interval_secs),
            ),
            ctx,
        ),
        None => spawn_session(UnavailableSession::new("pubsub", BUS_UNAVAILABLE), ctx),
    };

    sse_response(stream)
}
