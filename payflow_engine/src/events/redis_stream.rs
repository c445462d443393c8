//! Payment events over Redis Streams.
//!
//! Publishing is a single `XADD`; the entry id Redis returns is the broker acknowledgement. Consumers join a consumer
//! group and acknowledge (`XACK`) each message individually once it has been handled, so one failing message never
//! holds up the ones behind it. Anything left unacknowledged stays on the consumer's pending list and is read again
//! on the next pass or after a restart, which makes delivery at-least-once.
use std::{fmt::Debug, future::Future};

use futures_util::future::join_all;
use log::*;
use redis::{aio::MultiplexedConnection, streams::StreamReadReply, RedisError};
use thiserror::Error;

use crate::events::{EventPublisher, PaymentEvent, PublishError, PAYMENT_EVENT_TYPE};

pub const EVENT_FIELD: &str = "event";
pub const TYPE_FIELD: &str = "type";
pub const DEFAULT_STREAM_MAXLEN: usize = 1_000_000;
pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_BLOCK_MS: usize = 2_000;

/// Read from the start of this consumer's pending list.
const PENDING: &str = "0";
/// Read messages never delivered to any consumer of the group.
const NEW_MESSAGES: &str = ">";

#[derive(Debug, Clone, Error)]
pub enum ConsumerError {
    #[error("Redis error: {0}")]
    Redis(String),
    #[error("Could not handle the event. {0}")]
    HandlerFailed(String),
}

impl From<RedisError> for ConsumerError {
    fn from(e: RedisError) -> Self {
        ConsumerError::Redis(e.to_string())
    }
}

/// Something that reacts to payment events pulled from the channel. Returning an error leaves the message
/// unacknowledged so that it will be delivered again.
#[allow(async_fn_in_trait)]
pub trait PaymentEventHandler {
    async fn handle_payment_event(&self, event: PaymentEvent) -> Result<(), ConsumerError>;
}

//--------------------------------------   RedisStreamPublisher   ------------------------------------------------------
#[derive(Clone)]
pub struct RedisStreamPublisher {
    conn: MultiplexedConnection,
    stream: String,
    max_len: usize,
}

impl Debug for RedisStreamPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RedisStreamPublisher(stream: {}, max_len: {})", self.stream, self.max_len)
    }
}

impl RedisStreamPublisher {
    pub async fn connect(url: &str, stream: &str) -> Result<Self, RedisError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!("📡️ Connected to Redis. Publishing payment events to stream '{stream}'");
        Ok(Self { conn, stream: stream.to_string(), max_len: DEFAULT_STREAM_MAXLEN })
    }

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }
}

impl EventPublisher for RedisStreamPublisher {
    async fn publish_payment_event(&self, event: &PaymentEvent) -> Result<String, PublishError> {
        let payload = event.to_json()?;
        let mut conn = self.conn.clone();
        let id: String = redis::cmd("XADD")
            .arg(&self.stream)
            .arg("MAXLEN")
            .arg("~")
            .arg(self.max_len)
            .arg("*")
            .arg(TYPE_FIELD)
            .arg(PAYMENT_EVENT_TYPE)
            .arg(EVENT_FIELD)
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        debug!("📡️ Payment event for order {} published as {id}", event.order_id);
        Ok(id)
    }
}

//--------------------------------------      StreamMessage       ------------------------------------------------------
/// One entry read from the stream. `payload` is `None` when the entry has no event field, or was trimmed from the
/// stream while it sat on the pending list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMessage {
    pub id: String,
    pub payload: Option<String>,
}

impl StreamMessage {
    pub fn new<S: Into<String>>(id: S, payload: Option<String>) -> Self {
        Self { id: id.into(), payload }
    }
}

fn messages_from_reply(reply: Option<StreamReadReply>) -> Vec<StreamMessage> {
    reply
        .map(|r| {
            r.keys
                .into_iter()
                .flat_map(|k| k.ids)
                .map(|entry| {
                    let payload = entry.get::<String>(EVENT_FIELD);
                    StreamMessage { id: entry.id, payload }
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Runs the handler over every message in the batch concurrently and returns the ids that should be acknowledged.
///
/// A message is acknowledged when it was handled successfully, or when it can never be handled (no payload, or a
/// payload that is not a payment event). Messages whose handler failed are left out, so they remain pending.
pub async fn process_batch<H: PaymentEventHandler>(handler: &H, messages: Vec<StreamMessage>) -> Vec<String> {
    let jobs = messages.into_iter().map(|msg| async move {
        let Some(raw) = msg.payload.as_deref() else {
            warn!("📡️ Message {} has no event payload. Acknowledging it to get it out of the way.", msg.id);
            return Some(msg.id);
        };
        let event = match PaymentEvent::from_json(raw) {
            Ok(ev) => ev,
            Err(e) => {
                error!("📡️ Message {} is not a payment event ({e}). Acknowledging and dropping it. Payload: {raw}", msg.id);
                return Some(msg.id);
            },
        };
        let order_id = event.order_id;
        match handler.handle_payment_event(event).await {
            Ok(()) => {
                trace!("📡️ Message {} (order {order_id}) handled", msg.id);
                Some(msg.id)
            },
            Err(e) => {
                warn!("📡️ Message {} (order {order_id}) could not be handled and will be redelivered. {e}", msg.id);
                None
            },
        }
    });
    join_all(jobs).await.into_iter().flatten().collect()
}

//--------------------------------------   RedisStreamConsumer    ------------------------------------------------------
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub stream: String,
    pub group: String,
    pub consumer: String,
    pub batch_size: usize,
    pub block_ms: usize,
}

impl ConsumerConfig {
    pub fn new<S: Into<String>>(stream: S, group: S, consumer: S) -> Self {
        Self {
            stream: stream.into(),
            group: group.into(),
            consumer: consumer.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            block_ms: DEFAULT_BLOCK_MS,
        }
    }
}

pub struct RedisStreamConsumer {
    conn: MultiplexedConnection,
    config: ConsumerConfig,
}

impl RedisStreamConsumer {
    /// Connects and makes sure the consumer group exists, creating the stream if necessary.
    pub async fn connect(url: &str, config: ConsumerConfig) -> Result<Self, ConsumerError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        let mut consumer = Self { conn, config };
        consumer.ensure_group().await?;
        Ok(consumer)
    }

    async fn ensure_group(&mut self) -> Result<(), ConsumerError> {
        let created: Result<String, RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream)
            .arg(&self.config.group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut self.conn)
            .await;
        match created {
            Ok(_) => info!("📡️ Created consumer group '{}' on '{}'", self.config.group, self.config.stream),
            Err(e) if e.code() == Some("BUSYGROUP") => {
                debug!("📡️ Consumer group '{}' already exists", self.config.group)
            },
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    async fn read(&mut self, from: &str) -> Result<Vec<StreamMessage>, ConsumerError> {
        let mut cmd = redis::cmd("XREADGROUP");
        cmd.arg("GROUP").arg(&self.config.group).arg(&self.config.consumer).arg("COUNT").arg(self.config.batch_size);
        if from == NEW_MESSAGES {
            cmd.arg("BLOCK").arg(self.config.block_ms);
        }
        cmd.arg("STREAMS").arg(&self.config.stream).arg(from);
        let reply: Option<StreamReadReply> = cmd.query_async(&mut self.conn).await?;
        Ok(messages_from_reply(reply))
    }

    async fn ack(&mut self, ids: &[String]) -> Result<(), ConsumerError> {
        if ids.is_empty() {
            return Ok(());
        }
        let acked: i64 = redis::cmd("XACK")
            .arg(&self.config.stream)
            .arg(&self.config.group)
            .arg(ids)
            .query_async(&mut self.conn)
            .await?;
        trace!("📡️ Acknowledged {acked} messages");
        Ok(())
    }

    /// Reads one batch starting at `from`, handles it and acknowledges what succeeded.
    async fn poll<H: PaymentEventHandler>(&mut self, handler: &H, from: &str) -> Result<PollResult, ConsumerError> {
        let messages = self.read(from).await?;
        let read = messages.len();
        let last_id = messages.last().map(|m| m.id.clone());
        if read == 0 {
            return Ok(PollResult::default());
        }
        let acks = process_batch(handler, messages).await;
        self.ack(&acks).await?;
        Ok(PollResult { read, acked: acks.len(), last_id })
    }

    /// Consumes the stream until `shutdown` resolves.
    ///
    /// The pending list is replayed first, so anything left unacknowledged by a previous run is retried. While
    /// running, failed messages are retried whenever the stream goes quiet.
    pub async fn run<H, F>(mut self, handler: H, shutdown: F)
    where
        H: PaymentEventHandler,
        F: Future<Output = ()>,
    {
        info!(
            "📡️ Consumer '{}' of group '{}' listening on '{}'",
            self.config.consumer, self.config.group, self.config.stream
        );
        tokio::pin!(shutdown);
        // `Some(cursor)` while walking the pending list, `None` while reading new messages
        let mut pending_cursor = Some(PENDING.to_string());
        let mut retry_needed = false;
        loop {
            let from = pending_cursor.clone().unwrap_or_else(|| NEW_MESSAGES.to_string());
            let result = tokio::select! {
                _ = &mut shutdown => break,
                res = self.poll(&handler, &from) => res,
            };
            match result {
                Ok(poll) => {
                    if poll.read > poll.acked {
                        debug!("📡️ {} of {} messages will be retried", poll.read - poll.acked, poll.read);
                        retry_needed = true;
                    }
                    pending_cursor = match (pending_cursor.is_some(), poll.last_id) {
                        (true, Some(last)) => Some(last),
                        (true, None) => None,
                        // Quiet stream: revisit anything that failed earlier
                        (false, None) if retry_needed => {
                            retry_needed = false;
                            Some(PENDING.to_string())
                        },
                        (false, _) => None,
                    };
                },
                Err(e) => {
                    error!("📡️ Error reading from stream '{}': {e}. Retrying shortly.", self.config.stream);
                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                },
            }
        }
        info!("📡️ Consumer '{}' has shut down", self.config.consumer);
    }
}

#[derive(Debug, Default)]
struct PollResult {
    read: usize,
    acked: usize,
    last_id: Option<String>,
}
