use payflow_engine::{
    db_types::{Amount, Notification, OrderId, Pagination, PaymentRequest},
    CallerIdentity,
    PaymentApiError,
};
use serde::{Deserialize, Serialize};

use crate::errors::ServerError;

/// Body of `POST /api/payments`. `user_id` defaults to the caller. Only a super admin may name another user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPaymentParams {
    pub order_id: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
    pub payment_method: String,
    pub gross_amount: i64,
}

impl NewPaymentParams {
    pub fn into_request(self, caller: &CallerIdentity) -> Result<PaymentRequest, ServerError> {
        let user_id = self.user_id.or(caller.user_id()).ok_or(ServerError::AnonymousCaller)?;
        if !caller.may_act_for(user_id) {
            return Err(PaymentApiError::Forbidden.into());
        }
        Ok(PaymentRequest::new(OrderId(self.order_id), user_id, self.payment_method, Amount::from(self.gross_amount)))
    }
}

/// Query string of the listing endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
}

impl ListParams {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.limit)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPage {
    pub notifications: Vec<Notification>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl NotificationPage {
    pub fn new(notifications: Vec<Notification>, total: i64, pagination: Pagination) -> Self {
        Self {
            notifications,
            page: pagination.page,
            limit: pagination.limit,
            total,
            total_pages: pagination.total_pages(total),
        }
    }
}

/// A payment status notification from the gateway. `order_id` is the order code that was sent when the transaction
/// was opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayNotification {
    pub order_id: String,
    pub transaction_status: String,
    #[serde(default)]
    pub status_code: Option<String>,
    #[serde(default)]
    pub gross_amount: Option<String>,
    #[serde(default)]
    pub signature_key: Option<String>,
}
