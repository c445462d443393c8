use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqliteConnection;

use crate::{
    db_types::{OutboxEntry, Payment},
    events::{PaymentEvent, PAYMENT_EVENT_TYPE},
    traits::{OutboxRetry, PaymentStoreError},
};

/// Writes the outbox row for `payment`. Run this in the same transaction as the payment write.
///
/// The row only becomes due at `due_at`, which gives the caller a window to publish the event directly before the relay
/// picks it up.
pub async fn insert_event_for_payment(
    payment: &Payment,
    now: DateTime<Utc>,
    due_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<OutboxEntry, PaymentStoreError> {
    let event = PaymentEvent::new(payment, now);
    let payload = event.to_json()?;
    let entry: OutboxEntry = sqlx::query_as(
        r#"
            INSERT INTO payment_outbox (order_id, event_type, payload, next_attempt_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(payment.order_id)
    .bind(PAYMENT_EVENT_TYPE)
    .bind(payload)
    .bind(due_at)
    .bind(now)
    .fetch_one(conn)
    .await?;
    trace!("📤️ Outbox entry {} written for order {}", entry.id, entry.order_id);
    Ok(entry)
}

pub async fn fetch_outbox_entry(id: i64, conn: &mut SqliteConnection) -> Result<Option<OutboxEntry>, PaymentStoreError> {
    let entry = sqlx::query_as("SELECT * FROM payment_outbox WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(entry)
}

pub async fn fetch_due_entries(
    now: DateTime<Utc>,
    limit: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<OutboxEntry>, PaymentStoreError> {
    let entries = sqlx::query_as(
        r#"
            SELECT * FROM payment_outbox
            WHERE published_at IS NULL AND parked_at IS NULL AND next_attempt_at <= $1
            ORDER BY id ASC
            LIMIT $2
        "#,
    )
    .bind(now)
    .bind(limit)
    .fetch_all(conn)
    .await?;
    Ok(entries)
}

pub async fn mark_published(id: i64, at: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<(), PaymentStoreError> {
    let result =
        sqlx::query("UPDATE payment_outbox SET published_at = COALESCE(published_at, $1), last_error = NULL WHERE id = $2")
            .bind(at)
            .bind(id)
            .execute(conn)
            .await?;
    if result.rows_affected() == 0 {
        return Err(PaymentStoreError::OutboxEntryNotFound(id));
    }
    Ok(())
}

pub async fn reschedule(
    id: i64,
    retry: OutboxRetry,
    error: &str,
    conn: &mut SqliteConnection,
) -> Result<(), PaymentStoreError> {
    let result = sqlx::query(
        r#"
            UPDATE payment_outbox SET attempts = $1, next_attempt_at = $2, last_error = $3
            WHERE id = $4 AND published_at IS NULL
        "#,
    )
    .bind(retry.attempts)
    .bind(retry.next_attempt_at)
    .bind(error)
    .bind(id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        warn!("📤️ Outbox entry {id} was not rescheduled. It does not exist or has already been published.");
    }
    Ok(())
}

/// Takes an unpublished entry out of rotation, keeping `error` as the reason.
pub async fn park(id: i64, error: &str, at: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<(), PaymentStoreError> {
    let result = sqlx::query(
        "UPDATE payment_outbox SET parked_at = $1, last_error = $2 WHERE id = $3 AND published_at IS NULL",
    )
    .bind(at)
    .bind(error)
    .bind(id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(PaymentStoreError::OutboxEntryNotFound(id));
    }
    warn!("📤️ Outbox entry {id} parked. {error}");
    Ok(())
}
