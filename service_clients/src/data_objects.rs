use payflow_engine::{db_types::PaymentStatus, events::PaymentEvent};
use serde::{Deserialize, Serialize};

/// Sibling services wrap every payload in `{"data": ...}`. A missing or null `data` is an empty response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct DataEnvelope<T> {
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

/// The slice of an order that the public (unauthenticated) lookup returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicOrder {
    #[serde(alias = "id")]
    pub order_id: i64,
    #[serde(default)]
    pub order_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaymentStatusUpdate {
    pub payment_status: PaymentStatus,
    pub payment_method: String,
}

impl From<&PaymentEvent> for OrderPaymentStatusUpdate {
    fn from(event: &PaymentEvent) -> Self {
        Self { payment_status: event.payment_status, payment_method: event.payment_method.to_string() }
    }
}

//--------------------------------------   Snap transactions   ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionDetails {
    pub order_id: String,
    pub gross_amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub first_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapTransactionRequest {
    pub transaction_details: TransactionDetails,
    pub customer_details: CustomerDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapTransactionResponse {
    pub token: String,
    #[serde(default)]
    pub redirect_url: Option<String>,
}
