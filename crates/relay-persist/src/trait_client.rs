use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relay_types::Order;
use std::time::Duration;

use crate::error::Result;
use crate::models::{NewOrder, StatusUpdate, Telemetry};

/// Relational collaborator behind the database-backed streams
///
/// Every call borrows one pooled connection for the duration of that call only.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Current database server time
    async fn fetch_db_time(&self) -> Result<Option<DateTime<Utc>>>;

    async fn fetch_telemetry(&self) -> Result<Telemetry>;

    /// Latest `limit` orders, highest id first
    async fn fetch_latest_orders(&self, limit: u32) -> Result<Vec<Order>>;

    /// Orders with id above `watermark`, ascending by id
    async fn fetch_orders_since(&self, watermark: i64) -> Result<Vec<Order>>;

    async fn create_order(&self, order: NewOrder) -> Result<Order>;

    async fn update_order_status(&self, order_id: i64, status: &str) -> Result<StatusUpdate>;

    async fn ping(&self) -> Result<()>;
}

/// Publish/subscribe collaborator behind the channel relay
#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn subscribe(&self, channel: &str) -> Result<Box<dyn Subscription>>;

    /// Publish a message, returning how many subscribers received it
    async fn publish(&self, channel: &str, message: &str) -> Result<u64>;

    async fn ping(&self) -> Result<()>;
}

/// One live channel subscription, owned by a single session
#[async_trait]
pub trait Subscription: Send {
    fn channel(&self) -> &str;

    /// Wait up to `timeout` for the next message. `Ok(None)` when nothing arrived.
    async fn next_message(&mut self, timeout: Duration) -> Result<Option<String>>;

    async fn unsubscribe(&mut self) -> Result<()>;
}
