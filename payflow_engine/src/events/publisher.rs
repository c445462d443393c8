use log::*;
use thiserror::Error;

use crate::events::{EventProducers, PaymentEvent, QueueError, RedisStreamPublisher};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PublishError {
    #[error("Could not serialize the event. {0}")]
    Serialization(String),
    #[error("The event channel is unreachable. {0}")]
    Transport(String),
    #[error("The event channel refused the event. {0}")]
    Rejected(String),
}

impl From<serde_json::Error> for PublishError {
    fn from(e: serde_json::Error) -> Self {
        PublishError::Serialization(e.to_string())
    }
}

impl From<redis::RedisError> for PublishError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_io_error() || e.is_connection_dropped() || e.is_timeout() {
            PublishError::Transport(e.to_string())
        } else {
            PublishError::Rejected(e.to_string())
        }
    }
}

/// The publishing side of the event channel.
#[allow(async_fn_in_trait)]
pub trait EventPublisher: Clone {
    /// Publishes the event and returns the channel's acknowledgement (for Redis Streams, the entry id). An `Ok` means
    /// the channel has accepted responsibility for the event.
    async fn publish_payment_event(&self, event: &PaymentEvent) -> Result<String, PublishError>;
}

/// In-process delivery to the registered payment hooks. Used when no external broker is configured.
impl EventPublisher for EventProducers {
    async fn publish_payment_event(&self, event: &PaymentEvent) -> Result<String, PublishError> {
        for producer in &self.payment_event_producer {
            producer.try_publish(event.clone()).map_err(|e| match e {
                QueueError::Full => PublishError::Rejected(e.to_string()),
                QueueError::Closed => PublishError::Transport(e.to_string()),
            })?;
        }
        trace!("📬️ Payment event for order {} handed to {} hooks", event.order_id, self.payment_event_producer.len());
        Ok(format!("local:{}:{}", event.order_id.value(), event.occurred_at.timestamp_millis()))
    }
}

/// The event channel chosen at start-up: Redis Streams when a broker is configured, in-process hooks otherwise.
#[derive(Clone)]
pub enum ChannelPublisher {
    Redis(RedisStreamPublisher),
    InProcess(EventProducers),
}

impl std::fmt::Debug for ChannelPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelPublisher::Redis(p) => write!(f, "ChannelPublisher({p:?})"),
            ChannelPublisher::InProcess(p) => write!(f, "ChannelPublisher(in-process, {} hooks)", p.payment_event_producer.len()),
        }
    }
}

impl EventPublisher for ChannelPublisher {
    async fn publish_payment_event(&self, event: &PaymentEvent) -> Result<String, PublishError> {
        match self {
            ChannelPublisher::Redis(p) => p.publish_payment_event(event).await,
            ChannelPublisher::InProcess(p) => p.publish_payment_event(event).await,
        }
    }
}
