//! Pub/sub backends for server-sent events.

use async_trait::async_trait;
use dashmap::DashMap;
use futures::channel::mpsc::{unbounded, UnboundedSender};
use futures::stream::{self, BoxStream, StreamExt};
use std::fmt;

/// Stream of raw JSON payloads published on one channel.
pub type Subscription = BoxStream<'static, String>;

#[derive(Debug)]
pub enum BrokerError {
    Redis(redis::RedisError),
}

impl fmt::Display for BrokerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrokerError::Redis(e) => write!(f, "redis: {}", e),
        }
    }
}

impl std::error::Error for BrokerError {}

impl From<redis::RedisError> for BrokerError {
    fn from(e: redis::RedisError) -> Self {
        BrokerError::Redis(e)
    }
}

#[async_trait]
pub trait Broker: Send + Sync {
    /// Returns how many subscribers received the payload.
    async fn publish(&self, channel: &str, payload: String) -> Result<usize, BrokerError>;

    async fn subscribe(&self, channel: &str) -> Result<Subscription, BrokerError>;
}

/// In-process broker. Only reaches subscribers of the same process.
#[derive(Default)]
pub struct MemoryBroker {
    channels: DashMap<String, Vec<UnboundedSender<String>>>,
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn publish(&self, channel: &str, payload: String) -> Result<usize, BrokerError> {
        let mut delivered = 0;
        if let Some(mut senders) = self.channels.get_mut(channel) {
            senders.retain(|tx| {
                let ok = tx.unbounded_send(payload.clone()).is_ok();
                delivered += ok as usize;
                ok
            });
        }
        Ok(delivered)
    }

    async fn subscribe(&self, channel: &str) -> Result<Subscription, BrokerError> {
        let (tx, rx) = unbounded();
        self.channels.entry(channel.to_owned()).or_default().push(tx);
        Ok(rx.boxed())
    }
}

/// Redis pub/sub broker, shared between all workers and processes.
pub struct RedisBroker {
    client: redis::Client,
}

impl RedisBroker {
    pub fn new(url: &str) -> Result<Self, BrokerError> {
        Ok(Self {
            client: redis::Client::open(url)?,
        })
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn publish(&self, channel: &str, payload: String) -> Result<usize, BrokerError> {
        let mut conn = self.client.get_async_connection().await?;
        let receivers: usize = redis::cmd("PUBLISH")
            .arg(channel)
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        Ok(receivers)
    }

    async fn subscribe(&self, channel: &str) -> Result<Subscription, BrokerError> {
        let conn = self.client.get_async_connection().await?;
        let mut pubsub = conn.into_pubsub();
        pubsub.subscribe(channel).await?;

        Ok(stream::unfold(pubsub, |mut pubsub| async move {
            loop {
                let msg = {
                    let mut messages = Box::pin(pubsub.on_message());
                    messages.next().await?
                };
                match msg.get_payload::<String>() {
                    Ok(payload) => return Some((payload, pubsub)),
                    Err(e) => log::warn!("SSE: unreadable redis payload: {}", e),
                }
            }
        })
        .boxed())
    }
}
