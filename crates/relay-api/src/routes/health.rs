use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub services: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub endpoints: BTreeMap<String, String>,
}

/// Service name, version and endpoint map
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "health"
)]
pub async fn service_info() -> Json<ServiceInfo> {
    let endpoints = [
        ("health", "GET /health"),
        ("generic_stream", "GET /stream/{counter|timestamp|custom}"),
        ("database_stream", "POST /stream/database"),
        ("telemetry_stream", "POST /stream/database/telemetry"),
        ("order_changes", "POST /stream/orders/changes"),
        ("pubsub_stream", "GET /stream/pubsub/{channel}"),
        ("chat_stream", "GET|POST /chat/stream"),
        ("create_order", "POST /orders"),
        ("update_order_status", "PATCH /orders/{id}/status"),
        ("publish", "POST /publish/{channel}"),
        ("docs", "GET /api/docs"),
    ]
    .into_iter()
    .map(|(name, route)| (name.to_string(), route.to_string()))
    .collect();

    Json(ServiceInfo {
        service: "sse-relay".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints,
    })
}

/// Health check endpoint
///
/// Reports each collaborator as connected, disconnected or not configured
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service health", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let mut services = BTreeMap::new();

    let database = match &state.store {
        Some(store) => match store.ping().await {
            Ok(()) => "connected",
            Err(e) => {
                tracing::warn!("Database health check failed: {}", e);
                "disconnected"
            }
        },
        None => "not_configured",
    };
    services.insert("database".to_string(), database.to_string());

    let bus = match &state.bus {
        Some(bus) => match bus.ping().await {
            Ok(()) => "connected",
            Err(e) => {
                tracing::warn!("Message bus health check failed: {}", e);
                "disconnected"
            }
        },
        None => "not_configured",
    };
    services.insert("redis".to_string(), bus.to_string());

    let llm = if state.chat.is_some() {
        "configured"
    } else {
        "not_configured"
    };
    services.insert("llm".to_string(), llm.to_string());

    let any_configured = state.store.is_some() || state.bus.is_some() || state.chat.is_some();

    Json(HealthResponse {
        status: if any_configured { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        services,
    })
}
