//! Payflow Engine
//!
//! The payment engine confirms payments for an e-commerce platform and tells the rest of the platform about them.
//!
//! The library is divided into these sections:
//! 1. Data types ([`mod@db_types`]) and storage. The storage contracts live in [`mod@traits`]; [`SqliteDatabase`] is
//!    the SQLite backend. You should rarely need the database directly; use the APIs below.
//! 2. The payment flow ([`PaymentFlowApi`]). Records each payment exactly once per order, settles cash on delivery
//!    immediately, opens gateway transactions for everything else and publishes a [`events::PaymentEvent`] for each
//!    change through a transactional outbox ([`OutboxRelay`]).
//! 3. Notifications ([`NotificationApi`]). Stores notifications and pushes them to receivers that are connected, as
//!    tracked by the [`ConnectionRegistry`].
//! 4. The event channel ([`mod@events`]). Payment events travel over Redis Streams (or in-process hooks when no broker
//!    is configured) to independent consumers such as [`OrderStatusConsumer`] and [`PaymentNotifier`].
//!
//! Callers are identified by a [`CallerIdentity`], decoded once at the edge of the system.
pub mod db_types;
pub mod events;
mod flow_api;
pub mod identity;
#[cfg(feature = "sqlite")]
mod sqlite;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use flow_api::{
    connection_registry::{ConnectionRegistry, PushConnection, TransportError, DEFAULT_CONNECTION_BUFFER},
    consumers::{payment_notification, OrderStatusConsumer, PaymentNotifier, PAYMENT_NOTIFICATION_TYPE},
    errors::{NotificationApiError, PaymentApiError},
    notification_api::{DeliveryOutcome, DeliveryPolicy, NotificationApi, PushMessage},
    outbox_relay::{backoff, OutboxRelay, RelayReport},
    payment_flow_api::{PaymentFlowApi, DEFAULT_CALL_TIMEOUT},
};
pub use identity::{CallerIdentity, Role};
#[cfg(feature = "sqlite")]
pub use sqlite::{db as sqlite_db, SqliteDatabase, DEFAULT_OUTBOX_DELAY_SECS};
