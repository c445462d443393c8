//! # Backend and collaborator contracts
//!
//! This module defines the interfaces the payment engine needs from the outside world.
//!
//! ## Storage
//! * [`PaymentStore`] persists payments and enforces the one-live-payment-per-order rule.
//! * [`OutboxStore`] exposes the transactional outbox that makes event publication survivable.
//! * [`NotificationStore`] persists notifications and their Pending → Sent → Read lifecycle.
//!
//! The SQLite backend ([`crate::SqliteDatabase`]) implements all three.
//!
//! ## Sibling services
//! * [`OrderDirectory`], [`CustomerDirectory`] and [`OrderStatusUpdater`] front the order and user services.
//! * [`TransactionGateway`] fronts the third-party payment gateway.
mod data_objects;
mod notification_store;
mod payment_store;
mod services;

pub use data_objects::{
    CustomerProfile,
    GatewayTransactionRequest,
    NotificationQuery,
    OrderDetail,
    OutboxRetry,
    PaymentDetail,
    PaymentPage,
    PaymentQuery,
    PaymentSummary,
    RecordedPayment,
};
pub use notification_store::{NotificationStore, NotificationStoreError};
pub use payment_store::{OutboxStore, PaymentStore, PaymentStoreError};
pub use services::{CustomerDirectory, OrderDirectory, OrderStatusUpdater, ServiceError, TransactionGateway};
