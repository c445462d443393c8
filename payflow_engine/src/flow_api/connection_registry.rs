//! Live push connections, keyed by receiver id.
//!
//! The registry is the only shared mutable structure in the notification path. It sits on a sharded concurrent map, so
//! lookups for different receivers never contend and readers never wait on each other. Construct one per process and
//! hand clones to whoever needs it; clones share the same map.
use std::sync::Arc;

use dashmap::DashMap;
use log::*;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

pub const DEFAULT_CONNECTION_BUFFER: usize = 32;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("The connection has been closed")]
    Closed,
    #[error("The connection is not keeping up; its buffer is full")]
    Backpressure,
    #[error("Could not serialize the message. {0}")]
    Serialization(String),
}

/// The sending half of one live client connection. The receiving half is owned by whatever transport forwards
/// messages to the client (a server-sent-events stream, for instance).
#[derive(Debug, Clone)]
pub struct PushConnection {
    id: u64,
    sender: mpsc::Sender<String>,
}

impl PushConnection {
    /// Creates a connection with a random id, returning it with the receiving end of its buffer.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<String>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        (Self { id: rand::random::<u64>(), sender }, receiver)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Serializes `message` as JSON and writes it to the connection without waiting.
    pub fn write_json<T: Serialize>(&self, message: &T) -> Result<(), TransportError> {
        let json = serde_json::to_string(message).map_err(|e| TransportError::Serialization(e.to_string()))?;
        self.sender.try_send(json).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TransportError::Backpressure,
            mpsc::error::TrySendError::Closed(_) => TransportError::Closed,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<DashMap<i64, PushConnection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `connection` for `receiver_id`, replacing (not merging with) any earlier connection. The displaced
    /// connection is returned.
    pub fn add(&self, receiver_id: i64, connection: PushConnection) -> Option<PushConnection> {
        let id = connection.id();
        let previous = self.connections.insert(receiver_id, connection);
        match &previous {
            Some(old) => debug!("🔌️ Receiver {receiver_id} reconnected. Connection {} replaced by {id}", old.id()),
            None => debug!("🔌️ Receiver {receiver_id} connected ({id})"),
        }
        previous
    }

    /// The live connection for the receiver, if there is one.
    pub fn get(&self, receiver_id: i64) -> Option<PushConnection> {
        self.connections.get(&receiver_id).map(|c| c.value().clone())
    }

    /// Removes whatever connection is registered for the receiver. Removing an absent receiver is a no-op.
    pub fn remove(&self, receiver_id: i64) -> Option<PushConnection> {
        let removed = self.connections.remove(&receiver_id).map(|(_, c)| c);
        if removed.is_some() {
            debug!("🔌️ Receiver {receiver_id} disconnected");
        }
        removed
    }

    /// Removes the receiver's connection only if it is still `connection_id`. A client that has already reconnected
    /// keeps its new connection when the old one is torn down.
    pub fn remove_connection(&self, receiver_id: i64, connection_id: u64) -> bool {
        let removed = self.connections.remove_if(&receiver_id, |_, c| c.id() == connection_id).is_some();
        if removed {
            debug!("🔌️ Receiver {receiver_id} disconnected ({connection_id})");
        } else {
            trace!("🔌️ Connection {connection_id} for receiver {receiver_id} was already replaced or removed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
