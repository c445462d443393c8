use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    db_types::{NewPayment, OrderId, OutboxEntry, Payment, PaymentStatus},
    traits::data_objects::{OutboxRetry, PaymentQuery, RecordedPayment},
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PaymentStoreError {
    #[error("A non-failed payment already exists for order {0}")]
    PaymentAlreadyExists(OrderId),
    #[error("No payment exists for order {0}")]
    PaymentNotFound(OrderId),
    #[error("Payment {0} does not exist")]
    PaymentIdNotFound(i64),
    #[error("Outbox entry {0} does not exist")]
    OutboxEntryNotFound(i64),
    #[error("Could not serialize the payment event. {0}")]
    SerializationError(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for PaymentStoreError {
    fn from(e: sqlx::Error) -> Self {
        PaymentStoreError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for PaymentStoreError {
    fn from(e: serde_json::Error) -> Self {
        PaymentStoreError::SerializationError(e.to_string())
    }
}

/// Persistence for payment records.
///
/// Backends must guarantee that at most one non-failed payment exists per order. The guarantee has to hold under
/// concurrent inserts, so it belongs in the storage layer (a unique constraint) rather than in a read-then-write check.
#[allow(async_fn_in_trait)]
pub trait PaymentStore: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Fetches the non-failed payment for the given order, if there is one.
    async fn fetch_payment_for_order(&self, order_id: OrderId) -> Result<Option<Payment>, PaymentStoreError>;

    /// Fetches a payment by its surrogate id.
    async fn fetch_payment(&self, id: i64) -> Result<Option<Payment>, PaymentStoreError>;

    /// Stores a new payment and, in the same atomic transaction, an outbox row carrying the corresponding
    /// [`crate::events::PaymentEvent`].
    ///
    /// If a non-failed payment already exists for the order, [`PaymentStoreError::PaymentAlreadyExists`] is returned
    /// and nothing is written.
    async fn insert_payment(&self, payment: NewPayment) -> Result<RecordedPayment, PaymentStoreError>;

    /// Updates the status of the payment for the given order.
    ///
    /// When the status actually changes, an outbox row for the new state is written in the same transaction and its
    /// id is returned in the result. Setting the current status again is a no-op that writes no outbox row.
    ///
    /// If no payment exists for the order, [`PaymentStoreError::PaymentNotFound`] is returned.
    async fn update_payment_status(
        &self,
        order_id: OrderId,
        status: PaymentStatus,
    ) -> Result<RecordedPayment, PaymentStoreError>;

    /// Returns the page of payments matching the query, along with the total number of matching payments.
    async fn search_payments(&self, query: &PaymentQuery) -> Result<(Vec<Payment>, i64), PaymentStoreError>;
}

/// Access to the transactional outbox that backs event publication.
#[allow(async_fn_in_trait)]
pub trait OutboxStore: Clone {
    /// Unpublished entries whose next attempt is due at or before `now`, oldest first.
    async fn fetch_due_outbox_entries(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<OutboxEntry>, PaymentStoreError>;

    /// Marks the entry as published. Marking an already-published entry again has no effect.
    async fn mark_outbox_published(&self, id: i64, at: DateTime<Utc>) -> Result<(), PaymentStoreError>;

    /// Records a failed publish attempt and schedules the next one.
    async fn reschedule_outbox_entry(&self, id: i64, retry: OutboxRetry, error: &str) -> Result<(), PaymentStoreError>;

    /// Stops retrying an entry that can never be published. It is no longer returned as due.
    async fn park_outbox_entry(&self, id: i64, error: &str) -> Result<(), PaymentStoreError>;
}
