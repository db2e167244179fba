use chrono::{DateTime, Utc};
use relay_types::Order;

/// Row shape of the `orders` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRow {
    pub order_id: i64,
    pub customer_id: i64,
    pub status: String,
    pub salesman_id: Option<i64>,
    pub order_date: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Order {
            order_id: row.order_id,
            customer_id: row.customer_id,
            status: row.status,
            salesman_id: row.salesman_id,
            order_date: Some(row.order_date),
        }
    }
}
