#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{stream, StreamExt};
use relay_llm::{ChatClient, ChatRequest, EventStream, StreamEvent as UpstreamEvent};
use relay_persist::{
    MessageBus, NewOrder, OrderStore, PersistError, Result, StatusUpdate, Subscription, Telemetry,
};
use relay_types::Order;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn order(id: i64, status: &str) -> Order {
    Order {
        order_id: id,
        customer_id: 500 + id,
        status: status.to_string(),
        salesman_id: Some(3),
        order_date: None,
    }
}

/// Scripted store: each call pops the next queued result, empty queues yield empty results
#[derive(Default)]
pub struct FakeStore {
    pub latest: Mutex<VecDeque<Vec<Order>>>,
    pub since: Mutex<VecDeque<Vec<Order>>>,
    pub since_calls: Mutex<Vec<i64>>,
    pub fail_clock: bool,
    pub clock_calls: AtomicU32,
}

impl FakeStore {
    pub fn failing_clock() -> Self {
        Self {
            fail_clock: true,
            ..Self::default()
        }
    }

    pub fn push_latest(&self, orders: Vec<Order>) {
        self.latest.lock().unwrap().push_back(orders);
    }

    pub fn push_since(&self, orders: Vec<Order>) {
        self.since.lock().unwrap().push_back(orders);
    }
}

#[async_trait]
impl OrderStore for FakeStore {
    async fn fetch_db_time(&self) -> Result<Option<DateTime<Utc>>> {
        self.clock_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_clock {
            return Err(PersistError::Connection("listener refused".into()));
        }
        Ok(Some(Utc::now()))
    }

    async fn fetch_telemetry(&self) -> Result<Telemetry> {
        Ok(Telemetry {
            db_time: Some("2025-01-01 00:00:00".into()),
            object_count: Some(42),
            elapsed_ms: 3.14159,
        })
    }

    async fn fetch_latest_orders(&self, limit: u32) -> Result<Vec<Order>> {
        let mut orders = self.latest.lock().unwrap().pop_front().unwrap_or_default();
        orders.truncate(limit as usize);
        Ok(orders)
    }

    async fn fetch_orders_since(&self, watermark: i64) -> Result<Vec<Order>> {
        self.since_calls.lock().unwrap().push(watermark);
        Ok(self.since.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn create_order(&self, _order: NewOrder) -> Result<Order> {
        Err(PersistError::Internal("read-only fake".into()))
    }

    async fn update_order_status(&self, order_id: i64, _status: &str) -> Result<StatusUpdate> {
        Err(PersistError::OrderNotFound(order_id))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeBus {
    pub messages: Arc<Mutex<VecDeque<String>>>,
    pub unsubscribed: Arc<AtomicU32>,
    pub fail_subscribe: bool,
}

impl FakeBus {
    pub fn with_messages(messages: &[&str]) -> Self {
        let bus = Self::default();
        bus.messages
            .lock()
            .unwrap()
            .extend(messages.iter().map(|m| m.to_string()));
        bus
    }
}

#[async_trait]
impl MessageBus for FakeBus {
    async fn subscribe(&self, channel: &str) -> Result<Box<dyn Subscription>> {
        if self.fail_subscribe {
            return Err(PersistError::Connection("bus unreachable".into()));
        }
        Ok(Box::new(FakeSubscription {
            channel: channel.to_string(),
            messages: self.messages.clone(),
            unsubscribed: self.unsubscribed.clone(),
        }))
    }

    async fn publish(&self, _channel: &str, message: &str) -> Result<u64> {
        self.messages.lock().unwrap().push_back(message.to_string());
        Ok(1)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

pub struct FakeSubscription {
    channel: String,
    messages: Arc<Mutex<VecDeque<String>>>,
    unsubscribed: Arc<AtomicU32>,
}

#[async_trait]
impl Subscription for FakeSubscription {
    fn channel(&self) -> &str {
        &self.channel
    }

    async fn next_message(&mut self, timeout: Duration) -> Result<Option<String>> {
        let next = self.messages.lock().unwrap().pop_front();
        if next.is_none() {
            tokio::time::sleep(timeout).await;
        }
        Ok(next)
    }

    async fn unsubscribe(&mut self) -> Result<()> {
        self.unsubscribed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Upstream that replays a script, optionally hanging afterwards
pub struct FakeChat {
    pub script: Vec<std::result::Result<UpstreamEvent, String>>,
    pub hang_after_script: bool,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl FakeChat {
    pub fn deltas(deltas: &[&str]) -> Self {
        let mut script: Vec<_> = deltas
            .iter()
            .map(|d| {
                Ok(UpstreamEvent::Message {
                    content: d.to_string(),
                })
            })
            .collect();
        script.push(Ok(UpstreamEvent::Done {
            finish_reason: Some("stop".into()),
        }));
        Self {
            script,
            hang_after_script: false,
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ChatClient for FakeChat {
    async fn chat_stream(&self, request: ChatRequest) -> anyhow::Result<EventStream> {
        self.requests.lock().unwrap().push(request);

        let items: Vec<anyhow::Result<UpstreamEvent>> = self
            .script
            .iter()
            .cloned()
            .map(|item| item.map_err(anyhow::Error::msg))
            .collect();

        if self.hang_after_script {
            Ok(Box::pin(stream::iter(items).chain(stream::pending())))
        } else {
            Ok(Box::pin(stream::iter(items)))
        }
    }
}
