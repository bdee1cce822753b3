//! Server-sent events.
//!
//! Events are published per user on a channel named after the user id and
//! relayed to every open `/stream/users/{id}` response for that user.

mod broker;

pub use broker::{Broker, BrokerError, MemoryBroker, RedisBroker, Subscription};

use actix_web::web::Bytes;
use futures::stream::{self, Stream, StreamExt};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

static BROKER: OnceCell<Arc<dyn Broker>> = OnceCell::new();

/// Installs the process-wide broker. Only the first call has an effect.
pub fn init_broker(broker: Arc<dyn Broker>) -> bool {
    BROKER.set(broker).is_ok()
}

/// Returns the installed broker, falling back to an in-process one.
pub fn get_broker() -> Arc<dyn Broker> {
    BROKER
        .get_or_init(|| Arc::new(MemoryBroker::default()))
        .clone()
}

/// Picks the Redis broker when a URL is configured.
pub fn broker_from_config(redis_url: &str) -> Result<Arc<dyn Broker>, BrokerError> {
    if redis_url.is_empty() {
        log::info!("SSE: using in-process broker");
        Ok(Arc::new(MemoryBroker::default()))
    } else {
        log::info!("SSE: using redis broker");
        Ok(Arc::new(RedisBroker::new(redis_url)?))
    }
}

/// Channel name for a user's stream.
pub fn user_channel(user_id: i32) -> String {
    user_id.to_string()
}

/// One `text/event-stream` frame.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStream {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct EmptyEventError;

impl fmt::Display for EmptyEventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "an event needs at least one field")
    }
}

impl std::error::Error for EmptyEventError {}

impl EventStream {
    pub fn message(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: Some(event.into()),
            data: Some(data.into()),
            ..Default::default()
        }
    }

    pub fn comment(comment: impl Into<String>) -> Self {
        Self {
            comment: Some(comment.into()),
            ..Default::default()
        }
    }

    pub fn ping() -> Self {
        Self::comment("ping")
    }

    /// Serializes the frame. Multi-line data becomes one `data:` line each.
    pub fn encode(&self) -> Result<String, EmptyEventError> {
        let mut lines = Vec::new();
        if let Some(event) = &self.event {
            lines.push(format!("event:{}", event));
        }
        if let Some(data) = &self.data {
            lines.extend(data.lines().map(|line| format!("data:{}", line)));
        }
        if let Some(id) = &self.id {
            lines.push(format!("id:{}", id));
        }
        if let Some(retry) = self.retry {
            lines.push(format!("retry:{}", retry));
        }
        if let Some(comment) = &self.comment {
            lines.push(format!(":{}", comment));
        }

        if lines.is_empty() {
            return Err(EmptyEventError);
        }
        Ok(lines.join("\n") + "\n\n")
    }
}

/// Publishes to a user's channel. Delivery is best effort.
pub async fn publish_to_user(user_id: i32, event: &EventStream) {
    let payload = match serde_json::to_string(event) {
        Ok(payload) => payload,
        Err(e) => {
            log::error!("SSE: failed to serialize event: {}", e);
            return;
        }
    };
    if let Err(e) = get_broker().publish(&user_channel(user_id), payload).await {
        log::warn!("SSE: failed to publish to user {}: {}", user_id, e);
    }
}

/// Turns a subscription into response body chunks.
///
/// The first chunk advertises the reconnect delay; afterwards a message is
/// written as soon as one arrives and a `:ping` comment whenever the channel
/// stays quiet for `ping_interval`.
pub fn event_body(
    subscription: Subscription,
    ping_interval: Duration,
    retry_ms: u64,
) -> impl Stream<Item = Result<Bytes, actix_web::Error>> {
    let hello = EventStream {
        retry: Some(retry_ms),
        comment: Some("connected".to_owned()),
        ..Default::default()
    };
    let first = stream::iter(hello.encode().ok().map(|frame| Ok(Bytes::from(frame))));

    let rest = stream::unfold(Some(subscription), move |sub| async move {
        let mut sub = sub?;
        let frame = match actix_web::rt::time::timeout(ping_interval, sub.next()).await {
            Ok(Some(payload)) => match serde_json::from_str::<EventStream>(&payload)
                .map_err(|e| e.to_string())
                .and_then(|event| event.encode().map_err(|e| e.to_string()))
            {
                Ok(frame) => frame,
                Err(e) => {
                    log::warn!("SSE: dropping malformed message: {}", e);
                    EventStream::ping().encode().ok()?
                }
            },
            // Broker went away; end the response so the client reconnects.
            Ok(None) => return None,
            Err(_) => EventStream::ping().encode().ok()?,
        };
        Some((Ok(Bytes::from(frame)), Some(sub)))
    });

    first.chain(rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_all_fields() {
        let event = EventStream {
            data: Some("line one\nline two".to_owned()),
            event: Some("notification".to_owned()),
            id: Some("7".to_owned()),
            retry: Some(15000),
            comment: Some("hi".to_owned()),
        };
        assert_eq!(
            event.encode().unwrap(),
            "event:notification\ndata:line one\ndata:line two\nid:7\nretry:15000\n:hi\n\n"
        );
    }

    #[test]
    fn test_encode_ping() {
        assert_eq!(EventStream::ping().encode().unwrap(), ":ping\n\n");
    }

    #[test]
    fn test_encode_empty_is_error() {
        assert_eq!(EventStream::default().encode(), Err(EmptyEventError));
    }

    #[test]
    fn test_json_skips_missing_fields() {
        let json = serde_json::to_string(&EventStream::message("a", "b")).unwrap();
        assert_eq!(json, r#"{"data":"b","event":"a"}"#);
        let back: EventStream = serde_json::from_str(&json).unwrap();
        assert_eq!(back, EventStream::message("a", "b"));
    }

    #[actix_rt::test]
    async fn test_event_body_relays_and_pings() {
        let broker = MemoryBroker::default();
        let sub = broker.subscribe("9").await.unwrap();
        let body = event_body(sub, Duration::from_millis(20), 15000);
        futures::pin_mut!(body);

        let hello = body.next().await.unwrap().unwrap();
        assert_eq!(&hello[..], b"retry:15000\n:connected\n\n");

        // Nothing published yet.
        let ping = body.next().await.unwrap().unwrap();
        assert_eq!(&ping[..], b":ping\n\n");

        let payload = serde_json::to_string(&EventStream::message("notification", "{}")).unwrap();
        broker.publish("9", payload).await.unwrap();
        let msg = body.next().await.unwrap().unwrap();
        assert_eq!(&msg[..], b"event:notification\ndata:{}\n\n");
    }
}
