use thiserror::Error;

use crate::{
    db_types::{Amount, OrderId},
    identity::IdentityError,
    traits::{NotificationStoreError, PaymentStoreError, ServiceError},
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PaymentApiError {
    #[error("Payment already exists for order {0}")]
    AlreadyExists(OrderId),
    #[error("Invalid payment method: {0}")]
    InvalidPaymentMethod(String),
    #[error("The payment amount must be positive, but was {0}")]
    InvalidAmount(Amount),
    #[error("Invalid payment status: {0}")]
    InvalidStatus(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("You are not allowed to access this payment")]
    Forbidden,
    #[error("An upstream service is unavailable. {0}")]
    UpstreamUnavailable(String),
    #[error("Could not persist the payment. {0}")]
    PersistenceFailure(String),
    #[error("Invalid caller identity. {0}")]
    InvalidIdentity(#[from] IdentityError),
}

impl From<PaymentStoreError> for PaymentApiError {
    fn from(e: PaymentStoreError) -> Self {
        match e {
            PaymentStoreError::PaymentAlreadyExists(oid) => Self::AlreadyExists(oid),
            PaymentStoreError::PaymentNotFound(oid) => Self::NotFound(format!("No payment exists for order {oid}")),
            PaymentStoreError::PaymentIdNotFound(id) => Self::NotFound(format!("Payment {id} does not exist")),
            e => Self::PersistenceFailure(e.to_string()),
        }
    }
}

impl From<ServiceError> for PaymentApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::NotFound(s) => Self::NotFound(s),
            e => Self::UpstreamUnavailable(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotificationApiError {
    #[error("Notification {0} does not exist")]
    NotFound(i64),
    #[error("You are not allowed to access this notification")]
    Forbidden,
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<NotificationStoreError> for NotificationApiError {
    fn from(e: NotificationStoreError) -> Self {
        match e {
            NotificationStoreError::NotificationNotFound(id) => Self::NotFound(id),
            NotificationStoreError::DatabaseError(s) => Self::DatabaseError(s),
        }
    }
}
