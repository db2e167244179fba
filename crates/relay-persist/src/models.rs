use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Database clock and catalogue size sampled in one round trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub db_time: Option<String>,
    pub object_count: Option<i64>,
    /// Wall time spent on the query, in milliseconds
    pub elapsed_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer_id: i64,
    pub status: String,
    pub salesman_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub order_id: i64,
    pub old_status: String,
    pub new_status: String,
    pub updated_at: DateTime<Utc>,
}
