//! Server-sent-events transport for push notifications.
//!
//! Each stream owns the receiving half of a [`PushConnection`] that is registered for the caller. When the client goes
//! away the response stream is dropped, and the connection is removed from the registry with it.
use std::convert::Infallible;

use actix_web::{web::Bytes, HttpResponse};
use futures::{stream, Stream, StreamExt};
use log::*;
use payflow_engine::{ConnectionRegistry, PushConnection, DEFAULT_CONNECTION_BUFFER};
use tokio::sync::mpsc;

/// Unregisters the connection when the stream that owns it is dropped.
struct ConnectionGuard {
    registry: ConnectionRegistry,
    receiver_id: i64,
    connection_id: u64,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        trace!("🔌️ Push stream {} for receiver {} closed", self.connection_id, self.receiver_id);
        self.registry.remove_connection(self.receiver_id, self.connection_id);
    }
}

/// Frames each pushed JSON document as an SSE `data:` event. Ends when the connection is replaced or closed.
fn sse_events(
    messages: mpsc::Receiver<String>,
    guard: ConnectionGuard,
) -> impl Stream<Item = Result<Bytes, Infallible>> + 'static {
    let hello = stream::once(async { Ok::<_, Infallible>(Bytes::from_static(b": connected\n\n")) });
    let events = stream::unfold((messages, guard), |(mut messages, guard)| async move {
        let msg = messages.recv().await?;
        Some((Ok::<_, Infallible>(Bytes::from(format!("data: {msg}\n\n"))), (messages, guard)))
    });
    hello.chain(events)
}

pub fn open_push_stream(registry: &ConnectionRegistry, receiver_id: i64) -> HttpResponse {
    let (connection, messages) = PushConnection::channel(DEFAULT_CONNECTION_BUFFER);
    let guard = ConnectionGuard { registry: registry.clone(), receiver_id, connection_id: connection.id() };
    registry.add(receiver_id, connection);
    info!("🔌️ Push stream {} opened for receiver {receiver_id}", guard.connection_id);
    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(sse_events(messages, guard))
}
