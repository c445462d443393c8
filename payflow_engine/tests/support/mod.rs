#![allow(dead_code)]
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
    Mutex,
};

use chrono::{DateTime, Utc};
use log::*;
use mockall::mock;
use payflow_engine::{
    db_types::{NewPayment, OrderId, OutboxEntry, Payment, PaymentStatus},
    events::{EventPublisher, PaymentEvent, PublishError},
    traits::{
        CustomerDirectory,
        CustomerProfile,
        GatewayTransactionRequest,
        OrderDetail,
        OrderDirectory,
        OutboxRetry,
        OutboxStore,
        PaymentQuery,
        PaymentStore,
        PaymentStoreError,
        RecordedPayment,
        ServiceError,
        TransactionGateway,
    },
    CallerIdentity,
    Role,
    SqliteDatabase,
};
use tempfile::TempDir;

/// A freshly migrated database. Keep the `TempDir` alive for as long as the database is in use.
pub async fn prepare_db() -> (TempDir, SqliteDatabase) {
    let _ = env_logger::try_init();
    let dir = tempfile::tempdir().expect("Could not create a temporary directory");
    let url = format!("sqlite://{}/payflow_test.db", dir.path().display());
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    db.migrate().await.expect("Error running migrations");
    debug!("🚀️ Test database ready at {url}");
    (dir, db)
}

mock! {
    pub Services {}
    impl OrderDirectory for Services {
        async fn fetch_order(&self, order_id: OrderId, token: &str) -> Result<OrderDetail, ServiceError>;
        async fn fetch_order_by_code(&self, order_code: &str, token: &str) -> Result<OrderDetail, ServiceError>;
        async fn resolve_order_id(&self, order_code: &str) -> Result<OrderId, ServiceError>;
    }
    impl CustomerDirectory for Services {
        async fn fetch_own_profile(&self, token: &str) -> Result<CustomerProfile, ServiceError>;
        async fn fetch_customer(&self, user_id: i64, token: &str) -> Result<CustomerProfile, ServiceError>;
    }
}

mock! {
    pub Gateway {}
    impl TransactionGateway for Gateway {
        async fn create_transaction(&self, request: &GatewayTransactionRequest) -> Result<String, ServiceError>;
    }
}

/// Records every published event. Can be switched into a failing mode to simulate a broker outage.
#[derive(Clone, Default)]
pub struct RecordingPublisher {
    events: Arc<Mutex<Vec<PaymentEvent>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingPublisher {
    pub fn failing() -> Self {
        let publisher = Self::default();
        publisher.set_failing(true);
        publisher
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<PaymentEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventPublisher for RecordingPublisher {
    async fn publish_payment_event(&self, event: &PaymentEvent) -> Result<String, PublishError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PublishError::Transport("broker is down".into()));
        }
        let mut events = self.events.lock().unwrap();
        events.push(event.clone());
        Ok(format!("{}-0", events.len()))
    }
}

pub fn customer(user_id: i64) -> CallerIdentity {
    CallerIdentity::new("customer-token", Role::Customer, Some(user_id))
}

pub fn admin() -> CallerIdentity {
    CallerIdentity::new("admin-token", Role::SuperAdmin, Some(1))
}

pub fn order(id: i64) -> OrderDetail {
    OrderDetail {
        id,
        order_code: format!("ORD-{id}"),
        shipping_type: "Pickup".into(),
        order_datetime: "2024-05-01 10:00:00".into(),
        remarks: "Leave at the door".into(),
        status: "Pending".into(),
    }
}

pub fn profile(id: i64) -> CustomerProfile {
    CustomerProfile { id, name: format!("Customer {id}"), email: format!("customer{id}@example.com"), address: "1 Main St".into() }
}

/// A customer whose identity carries no user id.
pub fn anonymous() -> CallerIdentity {
    CallerIdentity::new("anonymous-token", Role::Customer, None)
}

/// A database that takes `delay` to answer every call.
#[derive(Clone)]
pub struct SlowStore {
    pub db: SqliteDatabase,
    pub delay: std::time::Duration,
}

impl PaymentStore for SlowStore {
    fn url(&self) -> &str {
        self.db.url()
    }

    async fn fetch_payment_for_order(&self, order_id: OrderId) -> Result<Option<Payment>, PaymentStoreError> {
        tokio::time::sleep(self.delay).await;
        self.db.fetch_payment_for_order(order_id).await
    }

    async fn fetch_payment(&self, id: i64) -> Result<Option<Payment>, PaymentStoreError> {
        tokio::time::sleep(self.delay).await;
        self.db.fetch_payment(id).await
    }

    async fn insert_payment(&self, payment: NewPayment) -> Result<RecordedPayment, PaymentStoreError> {
        tokio::time::sleep(self.delay).await;
        self.db.insert_payment(payment).await
    }

    async fn update_payment_status(
        &self,
        order_id: OrderId,
        status: PaymentStatus,
    ) -> Result<RecordedPayment, PaymentStoreError> {
        tokio::time::sleep(self.delay).await;
        self.db.update_payment_status(order_id, status).await
    }

    async fn search_payments(&self, query: &PaymentQuery) -> Result<(Vec<Payment>, i64), PaymentStoreError> {
        tokio::time::sleep(self.delay).await;
        self.db.search_payments(query).await
    }
}

impl OutboxStore for SlowStore {
    async fn fetch_due_outbox_entries(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<OutboxEntry>, PaymentStoreError> {
        tokio::time::sleep(self.delay).await;
        self.db.fetch_due_outbox_entries(now, limit).await
    }

    async fn mark_outbox_published(&self, id: i64, at: DateTime<Utc>) -> Result<(), PaymentStoreError> {
        tokio::time::sleep(self.delay).await;
        self.db.mark_outbox_published(id, at).await
    }

    async fn reschedule_outbox_entry(&self, id: i64, retry: OutboxRetry, error: &str) -> Result<(), PaymentStoreError> {
        tokio::time::sleep(self.delay).await;
        self.db.reschedule_outbox_entry(id, retry, error).await
    }

    async fn park_outbox_entry(&self, id: i64, error: &str) -> Result<(), PaymentStoreError> {
        tokio::time::sleep(self.delay).await;
        self.db.park_outbox_entry(id, error).await
    }
}
