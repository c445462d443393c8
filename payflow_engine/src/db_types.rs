use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
pub use payflow_common::Amount;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

//--------------------------------------        OrderId        ---------------------------------------------------------
/// The order id as assigned by the order service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub i64);

impl From<i64> for OrderId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl FromStr for OrderId {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>().map(Self).map_err(|_| ConversionError(format!("Invalid order id: {s}")))
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn value(&self) -> i64 {
        self.0
    }
}

//--------------------------------------    PaymentMethod      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Settled immediately; no gateway involvement.
    #[sqlx(rename = "cod")]
    #[serde(rename = "cod")]
    CashOnDelivery,
    /// Settled asynchronously by a third-party payment gateway.
    #[sqlx(rename = "gateway")]
    #[serde(rename = "gateway", alias = "midtrans")]
    Gateway,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::CashOnDelivery => write!(f, "cod"),
            PaymentMethod::Gateway => write!(f, "gateway"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cod" => Ok(Self::CashOnDelivery),
            "gateway" | "midtrans" => Ok(Self::Gateway),
            _ => Err(ConversionError(format!("Invalid payment method: {s}"))),
        }
    }
}

//--------------------------------------    PaymentStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Waiting for the gateway to confirm the transaction.
    Pending,
    /// The payment has been settled.
    Success,
    /// The payment was denied, cancelled or expired. A failed payment does not block a new payment for the order.
    Failed,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "Pending"),
            PaymentStatus::Success => write!(f, "Success"),
            PaymentStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Success" => Ok(Self::Success),
            "Failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

impl From<String> for PaymentStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid payment status: {value}. But this conversion cannot fail. Defaulting to Pending");
            PaymentStatus::Pending
        })
    }
}

impl PaymentStatus {
    /// Maps a gateway transaction status (as sent in gateway notifications) onto a payment status.
    pub fn from_gateway_status(status: &str) -> Result<Self, ConversionError> {
        match status.trim().to_ascii_lowercase().as_str() {
            "settlement" | "capture" | "success" => Ok(Self::Success),
            "pending" => Ok(Self::Pending),
            "deny" | "cancel" | "expire" | "failure" | "failed" => Ok(Self::Failed),
            _ => Err(ConversionError(format!("Unknown gateway status: {status}"))),
        }
    }
}

//--------------------------------------       Payment         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub order_id: OrderId,
    pub user_id: i64,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub gross_amount: Amount,
    pub payment_gateway_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------    PaymentRequest     ---------------------------------------------------------
/// An inbound request to pay for an order. The payment method is kept as the raw string the client sent so that
/// unknown methods are reported as such by the payment flow rather than rejected by the deserializer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub order_id: OrderId,
    pub user_id: i64,
    pub payment_method: String,
    pub gross_amount: Amount,
}

impl PaymentRequest {
    pub fn new<S: Into<String>>(order_id: OrderId, user_id: i64, payment_method: S, gross_amount: Amount) -> Self {
        Self { order_id, user_id, payment_method: payment_method.into(), gross_amount }
    }
}

//--------------------------------------      NewPayment       ---------------------------------------------------------
/// A validated payment, ready to be written to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub order_id: OrderId,
    pub user_id: i64,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub gross_amount: Amount,
    pub payment_gateway_id: Option<String>,
}

//--------------------------------------  NotificationStatus   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum NotificationStatus {
    /// Created, but not (yet) handed to a live connection.
    Pending,
    /// Delivery was attempted.
    Sent,
    /// The receiver acknowledged the notification.
    Read,
}

impl Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationStatus::Pending => write!(f, "Pending"),
            NotificationStatus::Sent => write!(f, "Sent"),
            NotificationStatus::Read => write!(f, "Read"),
        }
    }
}

impl FromStr for NotificationStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Sent" => Ok(Self::Sent),
            "Read" => Ok(Self::Read),
            s => Err(ConversionError(format!("Invalid notification status: {s}"))),
        }
    }
}

//--------------------------------------     Notification      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub notification_type: String,
    pub receiver_id: Option<i64>,
    pub receiver_email: Option<String>,
    pub subject: Option<String>,
    pub message: String,
    pub status: NotificationStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------    NewNotification    ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNotification {
    pub notification_type: String,
    pub receiver_id: Option<i64>,
    pub receiver_email: Option<String>,
    pub subject: Option<String>,
    pub message: String,
}

impl NewNotification {
    pub fn new<S: Into<String>>(notification_type: S, message: S) -> Self {
        Self {
            notification_type: notification_type.into(),
            receiver_id: None,
            receiver_email: None,
            subject: None,
            message: message.into(),
        }
    }

    pub fn with_receiver(mut self, receiver_id: i64) -> Self {
        self.receiver_id = Some(receiver_id);
        self
    }

    pub fn with_email<S: Into<String>>(mut self, email: S) -> Self {
        self.receiver_email = Some(email.into());
        self
    }

    pub fn with_subject<S: Into<String>>(mut self, subject: S) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

//--------------------------------------      OutboxEntry      ---------------------------------------------------------
/// A serialized event waiting to be published to the event channel. Rows are written in the same transaction as the
/// state change they describe.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct OutboxEntry {
    pub id: i64,
    pub order_id: OrderId,
    pub event_type: String,
    pub payload: String,
    pub attempts: i64,
    pub next_attempt_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub parked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------      Pagination       ---------------------------------------------------------
pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;
/// Highest page number accepted. Keeps `offset()` inside `i64` for every valid page size.
pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// 1-based page number
    pub page: i64,
    pub limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, limit: DEFAULT_PAGE_SIZE }
    }
}

impl Pagination {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page.filter(|p| *p > 0).unwrap_or(1).min(MAX_PAGE);
        let limit = limit.filter(|l| *l > 0).unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
        Self { page, limit }
    }

    pub fn offset(&self) -> i64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        if total <= 0 {
            0
        } else {
            (total + self.limit - 1) / self.limit
        }
    }
}
