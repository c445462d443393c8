//! Payment events and the channels that carry them.
//!
//! * [`channel`] and [`hooks`]: a bounded in-process pub-sub queue. Used for push delivery, and as the event channel
//!   when no broker is configured.
//! * [`EventPublisher`]: the publishing contract of the event channel.
//! * [`redis_stream`]: the durable channel, over Redis Streams consumer groups.
mod channel;
mod event_types;
mod hooks;
mod publisher;
pub mod redis_stream;

pub use channel::{EventHandler, EventProducer, Handler, QueueError, DEFAULT_MAX_IN_FLIGHT};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
pub use publisher::{ChannelPublisher, EventPublisher, PublishError};
pub use redis_stream::{
    ConsumerConfig,
    ConsumerError,
    PaymentEventHandler,
    RedisStreamConsumer,
    RedisStreamPublisher,
    StreamMessage,
};
