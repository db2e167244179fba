use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use relay_persist::{NewOrder, OrderStore};
use relay_types::Order;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

const MAX_STATUS_CHARS: usize = 20;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub customer_id: i64,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub salesman_id: Option<i64>,
}

fn default_status() -> String {
    "PENDING".to_string()
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub order_id: i64,
    pub customer_id: i64,
    pub status: String,
    pub salesman_id: Option<i64>,
    pub order_date: Option<DateTime<Utc>>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.order_id,
            customer_id: order.customer_id,
            status: order.status,
            salesman_id: order.salesman_id,
            order_date: order.order_date,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusUpdateResponse {
    pub order_id: i64,
    pub old_status: String,
    pub new_status: String,
    pub updated_at: DateTime<Utc>,
}

fn validate_status(status: &str) -> ApiResult<()> {
    let len = status.chars().count();
    if len == 0 || len > MAX_STATUS_CHARS {
        return Err(ApiError::BadRequest(format!(
            "status must be between 1 and {} characters",
            MAX_STATUS_CHARS
        )));
    }
    Ok(())
}

impl CreateOrderRequest {
    fn validate(&self) -> ApiResult<()> {
        if self.customer_id < 1 {
            return Err(ApiError::BadRequest("customer_id must be >= 1".to_string()));
        }
        if matches!(self.salesman_id, Some(id) if id < 1) {
            return Err(ApiError::BadRequest("salesman_id must be >= 1".to_string()));
        }
        validate_status(&self.status)
    }
}

fn store(state: &AppState) -> ApiResult<Arc<dyn OrderStore>> {
    state
        .store
        .clone()
        .ok_or(ApiError::ServiceUnavailable("Database"))
}

/// Create an order; its id is one above the current maximum
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 400, description = "Invalid request"),
        (status = 503, description = "Database not configured")
    ),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateOrderRequest>,
) -> ApiResult<(StatusCode, Json<OrderResponse>)> {
    req.validate()?;
    let store = store(&state)?;

    let order = store
        .create_order(NewOrder {
            customer_id: req.customer_id,
            status: req.status,
            salesman_id: req.salesman_id,
        })
        .await?;

    tracing::info!(order_id = order.order_id, status = %order.status, "Order created");

    Ok((StatusCode::CREATED, Json(order.into())))
}

/// Change an order's status
#[utoipa::path(
    patch,
    path = "/orders/{order_id}/status",
    params(("order_id" = i64, Path, description = "Order id")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = StatusUpdateResponse),
        (status = 404, description = "Order not found"),
        (status = 503, description = "Database not configured")
    ),
    tag = "orders"
)]
pub async fn update_order_status(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<Json<StatusUpdateResponse>> {
    validate_status(&req.status)?;
    let store = store(&state)?;

    let update = store.update_order_status(order_id, &req.status).await?;

    tracing::info!(
        order_id,
        old_status = %update.old_status,
        new_status = %update.new_status,
        "Order status updated"
    );

    Ok(Json(StatusUpdateResponse {
        order_id: update.order_id,
        old_status: update.old_status,
        new_status: update.new_status,
        updated_at: update.updated_at,
    }))
}
