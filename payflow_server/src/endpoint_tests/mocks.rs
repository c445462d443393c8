use std::sync::{Arc, Mutex};

use mockall::mock;
use payflow_engine::{
    db_types::OrderId,
    events::{EventPublisher, PaymentEvent, PublishError},
    traits::{
        CustomerDirectory,
        CustomerProfile,
        GatewayTransactionRequest,
        OrderDetail,
        OrderDirectory,
        ServiceError,
        TransactionGateway,
    },
};

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

#[derive(Clone, Default)]
pub struct RecordingPublisher {
    events: Arc<Mutex<Vec<PaymentEvent>>>,
}

impl RecordingPublisher {
    pub fn events(&self) -> Vec<PaymentEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventPublisher for RecordingPublisher {
    async fn publish_payment_event(&self, event: &PaymentEvent) -> Result<String, PublishError> {
        let mut events = self.events.lock().unwrap();
        events.push(event.clone());
        Ok(format!("{}-0", events.len()))
    }
}

pub fn order(id: i64) -> OrderDetail {
    OrderDetail {
        id,
        order_code: format!("ORD-{id}"),
        shipping_type: "Delivery".into(),
        order_datetime: "2024-05-01 10:00:00".into(),
        remarks: String::new(),
        status: "Pending".into(),
    }
}

pub fn profile(id: i64) -> CustomerProfile {
    CustomerProfile { id, name: format!("Customer {id}"), email: format!("customer{id}@example.com"), address: "1 Main St".into() }
}
