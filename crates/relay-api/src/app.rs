use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::Config,
    handlers::{chat, stream},
    middleware::logging,
    routes::{health, orders, publish},
    state::AppState,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::service_info,
        health::health_check,
        stream::generic_stream,
        stream::database_stream,
        stream::telemetry_stream,
        stream::order_changes_stream,
        stream::pubsub_stream,
        chat::chat_stream_get,
        chat::chat_stream_post,
        orders::create_order,
        orders::update_order_status,
        publish::publish_message,
    ),
    components(schemas(
        health::HealthResponse,
        health::ServiceInfo,
        stream::OrdersStreamRequest,
        chat::ChatStreamRequest,
        orders::CreateOrderRequest,
        orders::UpdateStatusRequest,
        orders::OrderResponse,
        orders::StatusUpdateResponse,
        publish::PublishResponse,
    )),
    tags(
        (name = "health", description = "Service status"),
        (name = "streams", description = "Server-sent event streams"),
        (name = "chat", description = "Completion token relay"),
        (name = "orders", description = "Order writes that feed the change stream"),
        (name = "pubsub", description = "Channel publishing"),
    )
)]
pub struct ApiDoc;

pub fn build_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health
        .route("/", get(health::service_info))
        .route("/health", get(health::health_check))
        // Streams
        .route("/stream/database", post(stream::database_stream))
        .route("/stream/database/telemetry", post(stream::telemetry_stream))
        .route("/stream/orders/changes", post(stream::order_changes_stream))
        .route("/stream/pubsub/:channel", get(stream::pubsub_stream))
        .route("/stream/:stream_type", get(stream::generic_stream))
        .route(
            "/chat/stream",
            get(chat::chat_stream_get).post(chat::chat_stream_post),
        )
        // Writes
        .route("/orders", post(orders::create_order))
        .route("/orders/:order_id/status", patch(orders::update_order_status))
        .route("/publish/:channel", post(publish::publish_message));

    Router::new()
        .merge(api_routes)
        .merge(SwaggerUi::new("/api/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn(logging::log_request))
        // Bounds the time to response headers; streams run past it
        .layer(TimeoutLayer::new(Duration::from_secs(300)))
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn build_cors_layer(config: &Config) -> CorsLayer {
    if config.cors.enabled {
        let mut cors = CorsLayer::new()
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PATCH,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers(Any);

        if config.cors.origins.iter().any(|o| o == "*") {
            cors = cors.allow_origin(Any);
        } else {
            let origins: Vec<axum::http::HeaderValue> = config
                .cors
                .origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();
            cors = cors.allow_origin(origins);
        }

        cors
    } else {
        CorsLayer::permissive()
    }
}
