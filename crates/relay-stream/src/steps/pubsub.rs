use async_trait::async_trait;
use relay_persist::{MessageBus, Subscription};
use relay_types::EventPayload;
use std::sync::Arc;
use std::time::Duration;

use crate::error::StepError;
use crate::poll_loop::PollStep;
use crate::sink::EventSink;

/// Message bodies are relayed as JSON when they parse, as a plain string otherwise
pub fn parse_message(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

/// Relays messages from one pub/sub channel
pub struct PubSubStep {
    bus: Arc<dyn MessageBus>,
    channel: String,
    receive_timeout: Duration,
    subscription: Option<Box<dyn Subscription>>,
}

impl PubSubStep {
    pub fn new(bus: Arc<dyn MessageBus>, channel: impl Into<String>, receive_timeout: Duration) -> Self {
        Self {
            bus,
            channel: channel.into(),
            receive_timeout,
            subscription: None,
        }
    }
}

#[async_trait]
impl PollStep for PubSubStep {
    fn kind(&self) -> &'static str {
        "pubsub"
    }

    async fn bootstrap(&mut self, sink: &mut EventSink) -> Result<(), StepError> {
        let subscription = sink.guard(self.bus.subscribe(&self.channel)).await??;
        self.subscription = Some(subscription);
        Ok(())
    }

    async fn poll(&mut self, sink: &mut EventSink) -> Result<(), StepError> {
        let subscription = self
            .subscription
            .as_mut()
            .ok_or_else(|| StepError::Precondition("Not subscribed".to_string()))?;

        let received = sink
            .guard(subscription.next_message(self.receive_timeout))
            .await??;

        if let Some(raw) = received {
            sink.emit(EventPayload::Pubsub {
                channel: self.channel.clone(),
                message: parse_message(&raw),
            })
            .await?;
        }
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            if let Err(e) = subscription.unsubscribe().await {
                tracing::warn!(channel = %self.channel, error = %e, "Unsubscribe failed");
            }
        }
    }
}
