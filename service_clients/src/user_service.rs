use log::*;
use payflow_engine::traits::CustomerProfile;
use reqwest::Method;

use crate::{
    helpers::{bearer_headers, join_url},
    ServiceClient,
    ServiceClientError,
};

/// Client for the user service.
#[derive(Clone)]
pub struct UserServiceApi {
    base_url: String,
    client: ServiceClient,
}

impl UserServiceApi {
    pub fn new<S: Into<String>>(base_url: S, client: ServiceClient) -> Self {
        Self { base_url: base_url.into(), client }
    }

    pub fn profile_url(&self) -> String {
        join_url(&self.base_url, "auth/profile")
    }

    pub fn customer_url(&self, user_id: i64) -> String {
        join_url(&self.base_url, &format!("admin/customers/{user_id}"))
    }

    pub async fn get_profile(&self, token: &str) -> Result<CustomerProfile, ServiceClientError> {
        trace!("👤️ Fetching caller profile");
        self.client.call_for_data::<CustomerProfile, ()>(Method::GET, &self.profile_url(), bearer_headers(token)?, None).await
    }

    /// Privileged lookup; only honoured for super admin tokens.
    pub async fn get_customer(&self, user_id: i64, token: &str) -> Result<CustomerProfile, ServiceClientError> {
        debug!("👤️ Fetching customer {user_id}");
        let url = self.customer_url(user_id);
        self.client.call_for_data::<CustomerProfile, ()>(Method::GET, &url, bearer_headers(token)?, None).await
    }
}
