use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{Amount, NotificationStatus, OrderId, Pagination, Payment, PaymentStatus};

/// Order attributes as reported by the order service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetail {
    pub id: i64,
    pub order_code: String,
    #[serde(default)]
    pub shipping_type: String,
    #[serde(default)]
    pub order_datetime: String,
    #[serde(default)]
    pub remarks: String,
    #[serde(default)]
    pub status: String,
}

/// Customer attributes as reported by the user service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProfile {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayTransactionRequest {
    pub order_code: String,
    pub amount: Amount,
    pub buyer_name: String,
    pub buyer_email: String,
}

//--------------------------------------   Payment queries     ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentQuery {
    /// Restrict results to this owner. `None` lists payments of every user.
    pub owner: Option<i64>,
    pub status: Option<PaymentStatus>,
    pub pagination: Pagination,
}

impl PaymentQuery {
    pub fn new(owner: Option<i64>) -> Self {
        Self { owner, ..Default::default() }
    }

    pub fn for_owner(owner: i64) -> Self {
        Self::new(Some(owner))
    }

    pub fn with_status(mut self, status: PaymentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }
}

/// A stored payment enriched with live order attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSummary {
    #[serde(flatten)]
    pub payment: Payment,
    pub order_code: String,
    pub order_shipping_type: String,
}

/// A stored payment enriched with live order and customer attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetail {
    #[serde(flatten)]
    pub payment: Payment,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_address: String,
    pub order_code: String,
    pub order_shipping_type: String,
    pub order_at: String,
    pub order_remarks: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentPage {
    pub payments: Vec<PaymentSummary>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

//-------------------------------------- Notification queries  ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationQuery {
    pub receiver_id: Option<i64>,
    pub status: Option<NotificationStatus>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutboxRetry {
    pub attempts: i64,
    pub next_attempt_at: DateTime<Utc>,
}

/// The result of writing a payment together with its outbox row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPayment {
    pub payment: Payment,
    pub outbox_id: Option<i64>,
}

impl RecordedPayment {
    pub fn order_id(&self) -> OrderId {
        self.payment.order_id
    }
}
