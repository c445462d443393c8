use chrono::{DateTime, Utc};
use log::*;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{NewPayment, OrderId, Payment, PaymentStatus},
    traits::{PaymentQuery, PaymentStoreError},
};

/// Inserts a new payment. This is not atomic on its own; callers that also write an outbox row should run it inside a
/// transaction and pass `&mut *tx` as the connection argument.
///
/// The partial unique index on `payments(order_id)` rejects a second live payment for the same order. That violation is
/// reported as [`PaymentStoreError::PaymentAlreadyExists`].
pub async fn insert_payment(
    payment: NewPayment,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Payment, PaymentStoreError> {
    let order_id = payment.order_id;
    let payment: Payment = sqlx::query_as(
        r#"
            INSERT INTO payments (order_id, user_id, payment_method, payment_status, gross_amount, payment_gateway_id,
                                  created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING *;
        "#,
    )
    .bind(payment.order_id)
    .bind(payment.user_id)
    .bind(payment.payment_method)
    .bind(payment.payment_status)
    .bind(payment.gross_amount)
    .bind(payment.payment_gateway_id)
    .bind(now)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => PaymentStoreError::PaymentAlreadyExists(order_id),
        _ => PaymentStoreError::from(e),
    })?;
    debug!("💳️ Payment {} for order {order_id} inserted with status {}", payment.id, payment.payment_status);
    Ok(payment)
}

/// Fetches the live (non-failed) payment for the order.
pub async fn fetch_payment_for_order(
    order_id: OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, PaymentStoreError> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE order_id = $1 AND payment_status <> 'Failed'")
        .bind(order_id)
        .fetch_optional(conn)
        .await?;
    Ok(payment)
}

/// The payment a status update for `order_id` applies to: the live payment if there is one, otherwise the most recent
/// failed payment.
pub async fn fetch_latest_payment_for_order(
    order_id: OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, PaymentStoreError> {
    let payment = sqlx::query_as(
        r#"
            SELECT * FROM payments WHERE order_id = $1
            ORDER BY (payment_status <> 'Failed') DESC, id DESC
            LIMIT 1
        "#,
    )
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}

pub async fn fetch_payment(id: i64, conn: &mut SqliteConnection) -> Result<Option<Payment>, PaymentStoreError> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(payment)
}

/// Moves the payment a status update for `order_id` applies to (see [`fetch_latest_payment_for_order`]) to `status`.
///
/// The change is a single conditional `UPDATE`, so a transaction that starts with it takes the write lock up front.
/// Returns `None` when there is no such payment or it already has the requested status.
pub async fn update_latest_status(
    order_id: OrderId,
    status: PaymentStatus,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, PaymentStoreError> {
    let payment = sqlx::query_as(
        r#"
            UPDATE payments SET payment_status = $1, updated_at = $2
            WHERE id = (
                SELECT id FROM payments WHERE order_id = $3
                ORDER BY (payment_status <> 'Failed') DESC, id DESC
                LIMIT 1
            ) AND payment_status <> $1
            RETURNING *;
        "#,
    )
    .bind(status)
    .bind(now)
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => {
            PaymentStoreError::DatabaseError(format!("The payment for order {order_id} cannot be revived: {err}"))
        },
        _ => PaymentStoreError::from(e),
    })?;
    Ok(payment)
}

fn push_payment_filters<'a>(builder: &mut QueryBuilder<'a, Sqlite>, query: &'a PaymentQuery) {
    let mut has_where = false;
    let mut clause = |builder: &mut QueryBuilder<'a, Sqlite>| {
        builder.push(if has_where { " AND " } else { " WHERE " });
        has_where = true;
    };
    if let Some(owner) = query.owner {
        clause(builder);
        builder.push("user_id = ").push_bind(owner);
    }
    if let Some(status) = query.status {
        clause(builder);
        builder.push("payment_status = ").push_bind(status);
    }
}

/// Returns the requested page of payments, newest first, together with the total number of matching rows.
pub async fn search_payments(
    query: &PaymentQuery,
    conn: &mut SqliteConnection,
) -> Result<(Vec<Payment>, i64), PaymentStoreError> {
    let mut count_builder = QueryBuilder::new("SELECT COUNT(*) FROM payments");
    push_payment_filters(&mut count_builder, query);
    let (total,): (i64,) = count_builder.build_query_as::<(i64,)>().fetch_one(&mut *conn).await?;

    let mut builder = QueryBuilder::new("SELECT * FROM payments");
    push_payment_filters(&mut builder, query);
    builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
    builder.push_bind(query.pagination.limit);
    builder.push(" OFFSET ");
    builder.push_bind(query.pagination.offset());
    trace!("💳️ Executing query: {}", builder.sql());
    let payments = builder.build_query_as::<Payment>().fetch_all(conn).await?;
    trace!("💳️ Result of search_payments: {} of {total}", payments.len());
    Ok((payments, total))
}
