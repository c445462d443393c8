use chrono::{DateTime, Utc};
use log::*;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{NewNotification, Notification},
    traits::{NotificationQuery, NotificationStoreError},
};

pub async fn insert_notification(
    notification: NewNotification,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Notification, NotificationStoreError> {
    let notification: Notification = sqlx::query_as(
        r#"
            INSERT INTO notifications (notification_type, receiver_id, receiver_email, subject, message, status,
                                       created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, 'Pending', $6, $6)
            RETURNING *;
        "#,
    )
    .bind(notification.notification_type)
    .bind(notification.receiver_id)
    .bind(notification.receiver_email)
    .bind(notification.subject)
    .bind(notification.message)
    .bind(now)
    .fetch_one(conn)
    .await?;
    debug!("🔔️ Notification {} created for receiver {:?}", notification.id, notification.receiver_id);
    Ok(notification)
}

pub async fn fetch_notification(
    id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Notification>, NotificationStoreError> {
    let notification =
        sqlx::query_as("SELECT * FROM notifications WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(notification)
}

fn push_notification_filters<'a>(builder: &mut QueryBuilder<'a, Sqlite>, query: &'a NotificationQuery) {
    let mut has_where = false;
    let mut clause = |builder: &mut QueryBuilder<'a, Sqlite>| {
        builder.push(if has_where { " AND " } else { " WHERE " });
        has_where = true;
    };
    if let Some(receiver_id) = query.receiver_id {
        clause(builder);
        builder.push("receiver_id = ").push_bind(receiver_id);
    }
    if let Some(status) = query.status {
        clause(builder);
        builder.push("status = ").push_bind(status);
    }
}

pub async fn search_notifications(
    query: &NotificationQuery,
    conn: &mut SqliteConnection,
) -> Result<(Vec<Notification>, i64), NotificationStoreError> {
    let mut count_builder = QueryBuilder::new("SELECT COUNT(*) FROM notifications");
    push_notification_filters(&mut count_builder, query);
    let (total,): (i64,) = count_builder.build_query_as::<(i64,)>().fetch_one(&mut *conn).await?;

    let mut builder = QueryBuilder::new("SELECT * FROM notifications");
    push_notification_filters(&mut builder, query);
    builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
    builder.push_bind(query.pagination.limit);
    builder.push(" OFFSET ");
    builder.push_bind(query.pagination.offset());
    trace!("🔔️ Executing query: {}", builder.sql());
    let notifications = builder.build_query_as::<Notification>().fetch_all(conn).await?;
    Ok((notifications, total))
}

/// `Pending` → `Sent`. Rows in any other state are left alone, so `sent_at` is written at most once.
pub async fn mark_sent(
    id: i64,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Notification, NotificationStoreError> {
    let updated: Option<Notification> = sqlx::query_as(
        r#"
            UPDATE notifications SET status = 'Sent', sent_at = $1, updated_at = $1
            WHERE id = $2 AND status = 'Pending'
            RETURNING *;
        "#,
    )
    .bind(at)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(n) => Ok(n),
        None => fetch_notification(id, conn).await?.ok_or(NotificationStoreError::NotificationNotFound(id)),
    }
}

/// Anything but `Read` → `Read`. A row that is already `Read` is returned untouched. A row that was never sent gets
/// `sent_at = read_at`.
pub async fn mark_read(
    id: i64,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Notification, NotificationStoreError> {
    let updated: Option<Notification> = sqlx::query_as(
        r#"
            UPDATE notifications SET status = 'Read', read_at = $1, sent_at = COALESCE(sent_at, $1), updated_at = $1
            WHERE id = $2 AND status <> 'Read'
            RETURNING *;
        "#,
    )
    .bind(at)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(n) => Ok(n),
        None => fetch_notification(id, conn).await?.ok_or(NotificationStoreError::NotificationNotFound(id)),
    }
}
