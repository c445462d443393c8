//! `SqliteDatabase` is the concrete storage backend for the payment engine.
//!
//! It implements [`PaymentStore`], [`OutboxStore`] and [`NotificationStore`] on top of a single SQLite pool.
use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use log::*;
use sqlx::{migrate::MigrateError, SqlitePool};

use super::db::{db_url, new_pool, notifications, outbox, payments};
use crate::{
    db_types::{NewNotification, NewPayment, Notification, OrderId, OutboxEntry, Payment, PaymentStatus},
    traits::{
        NotificationQuery,
        NotificationStore,
        NotificationStoreError,
        OutboxRetry,
        OutboxStore,
        PaymentQuery,
        PaymentStore,
        PaymentStoreError,
        RecordedPayment,
    },
};

/// How long a freshly written outbox row waits before the relay considers it. The payment flow publishes directly
/// right after commit; the relay only picks up what that attempt missed.
pub const DEFAULT_OUTBOX_DELAY_SECS: i64 = 10;

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
    outbox_delay: Duration,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl PaymentStore for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch_payment_for_order(&self, order_id: OrderId) -> Result<Option<Payment>, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_payment_for_order(order_id, &mut conn).await
    }

    async fn fetch_payment(&self, id: i64) -> Result<Option<Payment>, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_payment(id, &mut conn).await
    }

    /// Takes a new payment, and in a single atomic transaction,
    /// * inserts the payment. A unique violation aborts the transaction with `PaymentAlreadyExists`.
    /// * writes the outbox row carrying the payment event.
    async fn insert_payment(&self, payment: NewPayment) -> Result<RecordedPayment, PaymentStoreError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let payment = payments::insert_payment(payment, now, &mut tx).await?;
        let entry = outbox::insert_event_for_payment(&payment, now, now + self.outbox_delay, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Payment {} for order {} committed with outbox entry {}", payment.id, payment.order_id, entry.id);
        Ok(RecordedPayment { payment, outbox_id: Some(entry.id) })
    }

    async fn update_payment_status(
        &self,
        order_id: OrderId,
        status: PaymentStatus,
    ) -> Result<RecordedPayment, PaymentStoreError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let Some(payment) = payments::update_latest_status(order_id, status, now, &mut tx).await? else {
            tx.rollback().await?;
            let mut conn = self.pool.acquire().await?;
            let payment = payments::fetch_latest_payment_for_order(order_id, &mut conn)
                .await?
                .ok_or(PaymentStoreError::PaymentNotFound(order_id))?;
            debug!("🗃️ Payment {} for order {order_id} is already {}. Nothing to do.", payment.id, payment.payment_status);
            return Ok(RecordedPayment { payment, outbox_id: None });
        };
        let entry = outbox::insert_event_for_payment(&payment, now, now + self.outbox_delay, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Payment {} for order {order_id} moved to {status}", payment.id);
        Ok(RecordedPayment { payment, outbox_id: Some(entry.id) })
    }

    async fn search_payments(&self, query: &PaymentQuery) -> Result<(Vec<Payment>, i64), PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        payments::search_payments(query, &mut conn).await
    }
}

impl OutboxStore for SqliteDatabase {
    async fn fetch_due_outbox_entries(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<OutboxEntry>, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        outbox::fetch_due_entries(now, limit, &mut conn).await
    }

    async fn mark_outbox_published(&self, id: i64, at: DateTime<Utc>) -> Result<(), PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        outbox::mark_published(id, at, &mut conn).await
    }

    async fn reschedule_outbox_entry(&self, id: i64, retry: OutboxRetry, error: &str) -> Result<(), PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        outbox::reschedule(id, retry, error, &mut conn).await
    }

    async fn park_outbox_entry(&self, id: i64, error: &str) -> Result<(), PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        outbox::park(id, error, Utc::now(), &mut conn).await
    }
}

impl NotificationStore for SqliteDatabase {
    async fn insert_notification(&self, notification: NewNotification) -> Result<Notification, NotificationStoreError> {
        let mut conn = self.pool.acquire().await?;
        notifications::insert_notification(notification, Utc::now(), &mut conn).await
    }

    async fn fetch_notification(&self, id: i64) -> Result<Option<Notification>, NotificationStoreError> {
        let mut conn = self.pool.acquire().await?;
        notifications::fetch_notification(id, &mut conn).await
    }

    async fn search_notifications(
        &self,
        query: &NotificationQuery,
    ) -> Result<(Vec<Notification>, i64), NotificationStoreError> {
        let mut conn = self.pool.acquire().await?;
        notifications::search_notifications(query, &mut conn).await
    }

    async fn mark_notification_sent(
        &self,
        id: i64,
        at: DateTime<Utc>,
    ) -> Result<Notification, NotificationStoreError> {
        let mut conn = self.pool.acquire().await?;
        notifications::mark_sent(id, at, &mut conn).await
    }

    async fn mark_notification_read(
        &self,
        id: i64,
        at: DateTime<Utc>,
    ) -> Result<Notification, NotificationStoreError> {
        let mut conn = self.pool.acquire().await?;
        notifications::mark_read(id, at, &mut conn).await
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `PAYFLOW_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool, outbox_delay: Duration::seconds(DEFAULT_OUTBOX_DELAY_SECS) })
    }

    /// Sets how long new outbox rows wait before the relay picks them up.
    pub fn with_outbox_delay(mut self, delay: Duration) -> Self {
        self.outbox_delay = delay;
        self
    }

    /// Brings the schema up to date.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("🗃️ Migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Fetches an outbox row by id.
    pub async fn fetch_outbox_entry(&self, id: i64) -> Result<Option<OutboxEntry>, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        outbox::fetch_outbox_entry(id, &mut conn).await
    }
}
