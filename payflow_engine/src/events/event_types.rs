use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{Amount, Notification, OrderId, Payment, PaymentMethod, PaymentStatus};

pub const PAYMENT_EVENT_TYPE: &str = "payment";

/// The wire envelope published to the event channel whenever a payment is recorded or changes state.
///
/// Consumers receive it as JSON and must treat it as immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub order_id: OrderId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub gross_amount: Amount,
    pub occurred_at: DateTime<Utc>,
}

impl PaymentEvent {
    pub fn new(payment: &Payment, occurred_at: DateTime<Utc>) -> Self {
        Self {
            order_id: payment.order_id,
            user_id: Some(payment.user_id),
            payment_status: payment.payment_status,
            payment_method: payment.payment_method,
            gross_amount: payment.gross_amount,
            occurred_at,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl From<&Payment> for PaymentEvent {
    fn from(payment: &Payment) -> Self {
        Self::new(payment, payment.updated_at)
    }
}

/// A notification that is ready for push delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationCreatedEvent {
    pub notification: Notification,
}

impl NotificationCreatedEvent {
    pub fn new(notification: Notification) -> Self {
        Self { notification }
    }
}
