//! Contracts for the sibling services the payment flow talks to.
//!
//! These are implemented over HTTP by the `service_clients` crate. Implementations must not retry: every failure is
//! reported to the caller, which decides what to do with it.
use thiserror::Error;

use crate::{
    db_types::OrderId,
    events::PaymentEvent,
    traits::data_objects::{CustomerProfile, GatewayTransactionRequest, OrderDetail},
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("The upstream service is unavailable. {0}")]
    Unavailable(String),
    #[error("The upstream service rejected the request ({status}). {message}")]
    Rejected { status: u16, message: String },
    #[error("The upstream service returned an invalid response. {0}")]
    InvalidResponse(String),
}

#[allow(async_fn_in_trait)]
pub trait OrderDirectory {
    /// Fetches an order by id on behalf of the bearer of `token`.
    async fn fetch_order(&self, order_id: OrderId, token: &str) -> Result<OrderDetail, ServiceError>;

    /// Fetches an order by its human-facing code on behalf of the bearer of `token`.
    async fn fetch_order_by_code(&self, order_code: &str, token: &str) -> Result<OrderDetail, ServiceError>;

    /// Resolves an order code to an order id without authentication. Used by gateway callbacks, which carry no
    /// caller identity. An unknown code is [`ServiceError::NotFound`].
    async fn resolve_order_id(&self, order_code: &str) -> Result<OrderId, ServiceError>;
}

#[allow(async_fn_in_trait)]
pub trait CustomerDirectory {
    /// The profile of the bearer of `token`.
    async fn fetch_own_profile(&self, token: &str) -> Result<CustomerProfile, ServiceError>;

    /// Any customer's profile. Only privileged callers may use this.
    async fn fetch_customer(&self, user_id: i64, token: &str) -> Result<CustomerProfile, ServiceError>;
}

#[allow(async_fn_in_trait)]
pub trait TransactionGateway {
    /// Asks the payment gateway to open a transaction and returns the gateway's transaction reference. Any non-success
    /// response is terminal.
    async fn create_transaction(&self, request: &GatewayTransactionRequest) -> Result<String, ServiceError>;
}

#[allow(async_fn_in_trait)]
pub trait OrderStatusUpdater {
    /// Tells the order service about a payment outcome.
    async fn update_order_payment_status(&self, event: &PaymentEvent) -> Result<(), ServiceError>;
}
