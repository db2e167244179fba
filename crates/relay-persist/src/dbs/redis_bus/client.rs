use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::{ConnectionManager, PubSub};
use redis::AsyncCommands;
use std::time::Duration;

use crate::error::{PersistError, Result};
use crate::trait_client::{MessageBus, Subscription};

/// Redis pub/sub bus
///
/// Publishing goes through a shared `ConnectionManager`; every subscription opens its own
/// dedicated pub/sub connection, released when the subscription unsubscribes or is dropped.
#[derive(Clone)]
pub struct RedisBus {
    client: redis::Client,
    manager: ConnectionManager,
}

impl RedisBus {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| PersistError::Connection(format!("Invalid Redis URL: {}", e)))?;

        let manager = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| PersistError::Connection(e.to_string()))?;

        tracing::info!("Redis connection manager ready");
        Ok(Self { client, manager })
    }
}

#[async_trait]
impl MessageBus for RedisBus {
    async fn subscribe(&self, channel: &str) -> Result<Box<dyn Subscription>> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(channel).await?;

        tracing::info!(channel, "Subscribed to Redis channel");
        Ok(Box::new(RedisSubscription {
            pubsub,
            channel: channel.to_string(),
            active: true,
        }))
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<u64> {
        let mut conn = self.manager.clone();
        let receivers: u64 = conn.publish(channel, message).await?;
        Ok(receivers)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.manager.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

pub struct RedisSubscription {
    pubsub: PubSub,
    channel: String,
    active: bool,
}

#[async_trait]
impl Subscription for RedisSubscription {
    fn channel(&self) -> &str {
        &self.channel
    }

    async fn next_message(&mut self, timeout: Duration) -> Result<Option<String>> {
        if !self.active {
            return Err(PersistError::Connection(format!(
                "Subscription to {} is closed",
                self.channel
            )));
        }

        let mut messages = self.pubsub.on_message();
        match tokio::time::timeout(timeout, messages.next()).await {
            Err(_) => Ok(None),
            Ok(Some(msg)) => Ok(Some(msg.get_payload::<String>()?)),
            Ok(None) => Err(PersistError::Connection(
                "Redis pub/sub connection closed".to_string(),
            )),
        }
    }

    async fn unsubscribe(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        self.pubsub.unsubscribe(&self.channel).await?;
        tracing::info!(channel = %self.channel, "Unsubscribed from Redis channel");
        Ok(())
    }
}
