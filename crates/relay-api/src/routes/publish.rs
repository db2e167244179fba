use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PublishResponse {
    pub channel: String,
    /// Subscribers that received the message
    pub receivers: u64,
}

/// Publish a JSON message on `channel`
///
/// The body may be any JSON value; it is relayed as its serialized text.
#[utoipa::path(
    post,
    path = "/publish/{channel}",
    params(("channel" = String, Path, description = "Target channel")),
    responses(
        (status = 200, description = "Message published", body = PublishResponse),
        (status = 503, description = "Message bus not configured")
    ),
    tag = "pubsub"
)]
pub async fn publish_message(
    State(state): State<Arc<AppState>>,
    Path(channel): Path<String>,
    Json(message): Json<serde_json::Value>,
) -> ApiResult<Json<PublishResponse>> {
    let bus = state
        .bus
        .clone()
        .ok_or(ApiError::ServiceUnavailable("Message bus"))?;

    let payload = serde_json::to_string(&message).map_err(|_| ApiError::Internal)?;
    let receivers = bus.publish(&channel, &payload).await?;

    tracing::info!(channel = %channel, receivers, "Message published");

    Ok(Json(PublishResponse { channel, receivers }))
}
