use log::*;
use payflow_common::Secret;
use payflow_engine::traits::{GatewayTransactionRequest, ServiceError, TransactionGateway};
use reqwest::Method;

use crate::{
    data_objects::{CustomerDetails, SnapTransactionRequest, SnapTransactionResponse, TransactionDetails},
    helpers::join_url,
    ServiceClient,
    ServiceClientError,
};

/// Client for a Snap-style payment gateway. The server key is the basic-auth username; the password is empty.
#[derive(Clone)]
pub struct SnapGatewayApi {
    base_url: String,
    server_key: Secret<String>,
    client: ServiceClient,
}

impl SnapGatewayApi {
    pub fn new<S: Into<String>>(base_url: S, server_key: Secret<String>, client: ServiceClient) -> Self {
        Self { base_url: base_url.into(), server_key, client }
    }

    pub fn transactions_url(&self) -> String {
        join_url(&self.base_url, "snap/v1/transactions")
    }

    pub fn transaction_request(request: &GatewayTransactionRequest) -> SnapTransactionRequest {
        SnapTransactionRequest {
            transaction_details: TransactionDetails {
                order_id: request.order_code.clone(),
                gross_amount: request.amount.value(),
            },
            customer_details: CustomerDetails {
                first_name: request.buyer_name.clone(),
                email: request.buyer_email.clone(),
            },
        }
    }

    pub async fn create_snap_transaction(
        &self,
        request: &GatewayTransactionRequest,
    ) -> Result<SnapTransactionResponse, ServiceClientError> {
        let body = Self::transaction_request(request);
        debug!("💳️ Opening gateway transaction for order {} ({})", request.order_code, request.amount);
        let response = self
            .client
            .call_with_basic_auth::<SnapTransactionResponse, SnapTransactionRequest>(
                Method::POST,
                &self.transactions_url(),
                self.server_key.reveal(),
                Some(&body),
            )
            .await?;
        if response.token.is_empty() {
            return Err(ServiceClientError::EmptyResponse);
        }
        info!("💳️ Gateway transaction {} opened for order {}", response.token, request.order_code);
        Ok(response)
    }
}

impl TransactionGateway for SnapGatewayApi {
    async fn create_transaction(&self, request: &GatewayTransactionRequest) -> Result<String, ServiceError> {
        let response = self.create_snap_transaction(request).await?;
        Ok(response.token)
    }
}
