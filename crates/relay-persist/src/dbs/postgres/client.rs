use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relay_types::Order;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::{Duration, Instant};

use super::models::OrderRow;
use crate::error::{PersistError, Result};
use crate::models::{NewOrder, StatusUpdate, Telemetry};
use crate::trait_client::OrderStore;

const ORDER_COLUMNS: &str = "order_id, customer_id, status, salesman_id, order_date";

const TELEMETRY_QUERY: &str = r#"
    SELECT
        to_char(clock_timestamp(), 'YYYY-MM-DD"T"HH24:MI:SS.MSOF') AS db_time,
        (SELECT COUNT(*) FROM pg_class c
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE n.nspname = current_schema()) AS object_count
"#;

/// Postgres-backed order store over a shared connection pool
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await
            .map_err(|e| PersistError::Connection(e.to_string()))?;

        tracing::info!(max_connections, "Postgres pool ready");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn fetch_db_time(&self) -> Result<Option<DateTime<Utc>>> {
        let now = sqlx::query_scalar::<_, DateTime<Utc>>("SELECT NOW()")
            .fetch_optional(&self.pool)
            .await?;
        Ok(now)
    }

    async fn fetch_telemetry(&self) -> Result<Telemetry> {
        let start = Instant::now();
        let row = sqlx::query_as::<_, (Option<String>, Option<i64>)>(TELEMETRY_QUERY)
            .fetch_optional(&self.pool)
            .await?;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let (db_time, object_count) = row.unwrap_or((None, None));
        Ok(Telemetry {
            db_time,
            object_count,
            elapsed_ms,
        })
    }

    async fn fetch_latest_orders(&self, limit: u32) -> Result<Vec<Order>> {
        let sql = format!(
            "SELECT {} FROM orders ORDER BY order_id DESC LIMIT $1",
            ORDER_COLUMNS
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Order::from).collect())
    }

    async fn fetch_orders_since(&self, watermark: i64) -> Result<Vec<Order>> {
        let sql = format!(
            "SELECT {} FROM orders WHERE order_id > $1 ORDER BY order_id",
            ORDER_COLUMNS
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(watermark)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Order::from).collect())
    }

    async fn create_order(&self, order: NewOrder) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        // Serialize id allocation against concurrent inserts
        sqlx::query("LOCK TABLE orders IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;

        let next_id: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(order_id), 0) + 1 FROM orders")
                .fetch_one(&mut *tx)
                .await?;

        let sql = format!(
            "INSERT INTO orders ({}) VALUES ($1, $2, $3, $4, NOW()) RETURNING {}",
            ORDER_COLUMNS, ORDER_COLUMNS
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(next_id)
            .bind(order.customer_id)
            .bind(&order.status)
            .bind(order.salesman_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(order_id = row.order_id, customer_id = row.customer_id, "Order created");
        Ok(row.into())
    }

    async fn update_order_status(&self, order_id: i64, status: &str) -> Result<StatusUpdate> {
        let mut tx = self.pool.begin().await?;

        let old_status: Option<String> =
            sqlx::query_scalar("SELECT status FROM orders WHERE order_id = $1 FOR UPDATE")
                .bind(order_id)
                .fetch_optional(&mut *tx)
                .await?;

        let old_status = old_status.ok_or(PersistError::OrderNotFound(order_id))?;

        sqlx::query("UPDATE orders SET status = $1 WHERE order_id = $2")
            .bind(status)
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(order_id, old_status = %old_status, new_status = %status, "Order status updated");
        Ok(StatusUpdate {
            order_id,
            old_status,
            new_status: status.to_string(),
            updated_at: Utc::now(),
        })
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
