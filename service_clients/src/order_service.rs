use log::*;
use payflow_engine::{db_types::OrderId, events::PaymentEvent, traits::OrderDetail};
use reqwest::{header::HeaderMap, Method};

use crate::{
    data_objects::{OrderPaymentStatusUpdate, PublicOrder},
    helpers::{bearer_headers, join_url},
    ServiceClient,
    ServiceClientError,
};

/// Client for the order service.
#[derive(Clone)]
pub struct OrderServiceApi {
    base_url: String,
    client: ServiceClient,
}

impl OrderServiceApi {
    pub fn new<S: Into<String>>(base_url: S, client: ServiceClient) -> Self {
        Self { base_url: base_url.into(), client }
    }

    pub fn order_url(&self, order_id: OrderId) -> String {
        join_url(&self.base_url, &format!("auth/orders/{}", order_id.value()))
    }

    pub fn order_by_code_url(&self, order_code: &str) -> String {
        join_url(&self.base_url, &format!("auth/orders/{order_code}/code"))
    }

    pub fn public_order_url(&self, order_code: &str) -> String {
        join_url(&self.base_url, &format!("public/orders/{order_code}/code"))
    }

    pub fn payment_status_url(&self, order_id: OrderId) -> String {
        join_url(&self.base_url, &format!("internal/orders/{}/payment-status", order_id.value()))
    }

    pub async fn get_order(&self, order_id: OrderId, token: &str) -> Result<OrderDetail, ServiceClientError> {
        let url = self.order_url(order_id);
        debug!("🛒️ Fetching order {order_id}");
        self.client.call_for_data::<OrderDetail, ()>(Method::GET, &url, bearer_headers(token)?, None).await
    }

    pub async fn get_order_by_code(&self, order_code: &str, token: &str) -> Result<OrderDetail, ServiceClientError> {
        let url = self.order_by_code_url(order_code);
        debug!("🛒️ Fetching order {order_code}");
        self.client.call_for_data::<OrderDetail, ()>(Method::GET, &url, bearer_headers(token)?, None).await
    }

    /// The unauthenticated lookup. Any non-success answer means the code is unknown.
    pub async fn get_public_order(&self, order_code: &str) -> Result<PublicOrder, ServiceClientError> {
        let url = self.public_order_url(order_code);
        debug!("🛒️ Resolving order code {order_code}");
        self.client.call_for_data::<PublicOrder, ()>(Method::GET, &url, HeaderMap::new(), None).await.map_err(|e| match e {
            ServiceClientError::QueryError { status, message } => {
                debug!("🛒️ Order code {order_code} could not be resolved ({status}). {message}");
                ServiceClientError::QueryError { status: 404, message: format!("Order {order_code} not found") }
            },
            e => e,
        })
    }

    pub async fn update_payment_status(&self, event: &PaymentEvent) -> Result<(), ServiceClientError> {
        let url = self.payment_status_url(event.order_id);
        let body = OrderPaymentStatusUpdate::from(event);
        let _ack = self
            .client
            .call::<serde_json::Value, OrderPaymentStatusUpdate>(Method::PUT, &url, HeaderMap::new(), Some(&body))
            .await?;
        info!("🛒️ Order {} payment status set to {}", event.order_id, event.payment_status);
        Ok(())
    }
}
