use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// One order row as the change stream sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: i64,
    pub customer_id: i64,
    pub status: String,
    pub salesman_id: Option<i64>,
    pub order_date: Option<DateTime<Utc>>,
}

impl Order {
    /// Transition record for a status that moved from `old_status` to this row's status
    pub fn transition_from(&self, old_status: impl Into<String>) -> StatusTransition {
        StatusTransition {
            order_id: self.order_id,
            customer_id: self.customer_id,
            old_status: old_status.into(),
            new_status: self.status.clone(),
            salesman_id: self.salesman_id,
            order_date: self.order_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransition {
    pub order_id: i64,
    pub customer_id: i64,
    pub old_status: String,
    pub new_status: String,
    pub salesman_id: Option<i64>,
    pub order_date: Option<DateTime<Utc>>,
}

/// A change detected between two polls of the orders table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderChange {
    /// Row with an id above the watermark
    New { order: Order },

    /// Tracked row whose status differs from the last one seen
    StatusChanged { order: StatusTransition },
}

impl OrderChange {
    pub fn order_id(&self) -> i64 {
        match self {
            OrderChange::New { order } => order.order_id,
            OrderChange::StatusChanged { order } => order.order_id,
        }
    }
}

/// Every event kind a session can emit. The tag doubles as the SSE event name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    Counter {
        count: u64,
    },

    Timestamp {
        current_time: String,
        message: String,
    },

    Custom {
        data: String,
    },

    /// Database clock sample
    Database {
        count: u64,
        db_time: Option<String>,
    },

    Telemetry {
        count: u64,
        db_time: Option<String>,
        object_count: Option<i64>,
        query_ms: f64,
    },

    /// Bootstrap snapshot of the order change stream is loaded
    OrdersReady {
        tracked: usize,
        last_max_id: i64,
    },

    OrdersChange {
        #[serde(flatten)]
        change: OrderChange,
        count: u64,
    },

    OrdersHeartbeat {
        tracked: usize,
        last_max_id: i64,
    },

    /// Message relayed from a pub/sub channel
    Pubsub {
        channel: String,
        message: serde_json::Value,
    },

    /// Re-chunked completion text
    Delta {
        delta: String,
    },

    /// Completion finished, nothing follows
    Done,

    Error {
        error: String,
    },
}

impl EventPayload {
    pub fn name(&self) -> &'static str {
        match self {
            EventPayload::Counter { .. } => "counter",
            EventPayload::Timestamp { .. } => "timestamp",
            EventPayload::Custom { .. } => "custom",
            EventPayload::Database { .. } => "database",
            EventPayload::Telemetry { .. } => "telemetry",
            EventPayload::OrdersReady { .. } => "orders_ready",
            EventPayload::OrdersChange { .. } => "orders_change",
            EventPayload::OrdersHeartbeat { .. } => "orders_heartbeat",
            EventPayload::Pubsub { .. } => "pubsub",
            EventPayload::Delta { .. } => "delta",
            EventPayload::Done => "done",
            EventPayload::Error { .. } => "error",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, EventPayload::Error { .. })
    }
}

/// Wire-ready SSE event: the payload plus the server timestamp it was formatted at
///
/// Serializes to a flat JSON object carrying `type`, `timestamp` and the payload fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    #[serde(flatten)]
    pub payload: EventPayload,
    pub timestamp: DateTime<Utc>,
}

impl StreamEvent {
    /// Stamp a payload with the current server time
    pub fn new(payload: EventPayload) -> Self {
        Self {
            payload,
            timestamp: Utc::now(),
        }
    }

    /// Error event carrying the display form of `error`
    pub fn error(error: impl Display) -> Self {
        Self::new(EventPayload::Error {
            error: error.to_string(),
        })
    }

    pub fn event_name(&self) -> &'static str {
        self.payload.name()
    }

    pub fn is_error(&self) -> bool {
        self.payload.is_error()
    }

    pub fn data_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// `event: <name>\ndata: <json>\n\n`
    pub fn to_sse_frame(&self) -> serde_json::Result<String> {
        Ok(format!("event: {}\ndata: {}\n\n", self.event_name(), self.data_json()?))
    }
}
