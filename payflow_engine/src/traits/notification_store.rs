use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    db_types::{NewNotification, Notification},
    traits::data_objects::NotificationQuery,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotificationStoreError {
    #[error("Notification {0} does not exist")]
    NotificationNotFound(i64),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for NotificationStoreError {
    fn from(e: sqlx::Error) -> Self {
        NotificationStoreError::DatabaseError(e.to_string())
    }
}

#[allow(async_fn_in_trait)]
pub trait NotificationStore: Clone {
    /// Stores a new notification with status `Pending`.
    async fn insert_notification(&self, notification: NewNotification) -> Result<Notification, NotificationStoreError>;

    async fn fetch_notification(&self, id: i64) -> Result<Option<Notification>, NotificationStoreError>;

    /// Returns the page of notifications matching the query, newest first, along with the total number of matches.
    async fn search_notifications(
        &self,
        query: &NotificationQuery,
    ) -> Result<(Vec<Notification>, i64), NotificationStoreError>;

    /// Moves a `Pending` notification to `Sent` and stamps `sent_at`. Notifications that are already `Sent` or `Read`
    /// are returned unchanged; `sent_at` is only ever set once.
    async fn mark_notification_sent(
        &self,
        id: i64,
        at: DateTime<Utc>,
    ) -> Result<Notification, NotificationStoreError>;

    /// Moves the notification to `Read` and stamps `read_at`.
    ///
    /// This is idempotent: a notification that is already `Read` is returned unchanged. If the notification was never
    /// sent, `sent_at` is stamped with the same instant so that `read_at` never precedes `sent_at`.
    async fn mark_notification_read(
        &self,
        id: i64,
        at: DateTime<Utc>,
    ) -> Result<Notification, NotificationStoreError>;
}
