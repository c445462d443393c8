use std::time::Duration;

use log::*;
use payflow_common::{parse_env_or, Secret};

pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct ServiceClientConfig {
    pub order_service_url: String,
    pub user_service_url: String,
    pub gateway_url: String,
    pub gateway_server_key: Secret<String>,
    /// Upper bound on any single outbound call
    pub call_timeout: Duration,
}

impl Default for ServiceClientConfig {
    fn default() -> Self {
        Self {
            order_service_url: "http://localhost:8082".to_string(),
            user_service_url: "http://localhost:8081".to_string(),
            gateway_url: "https://app.sandbox.midtrans.com".to_string(),
            gateway_server_key: Secret::new(String::default()),
            call_timeout: Duration::from_millis(DEFAULT_CALL_TIMEOUT_MS),
        }
    }
}

impl ServiceClientConfig {
    pub fn new_from_env_or_default() -> Self {
        let defaults = Self::default();
        let order_service_url = std::env::var("PAYFLOW_ORDER_SERVICE_URL").unwrap_or_else(|_| {
            warn!("🪛️ PAYFLOW_ORDER_SERVICE_URL not set, using {} as default", defaults.order_service_url);
            defaults.order_service_url.clone()
        });
        let user_service_url = std::env::var("PAYFLOW_USER_SERVICE_URL").unwrap_or_else(|_| {
            warn!("🪛️ PAYFLOW_USER_SERVICE_URL not set, using {} as default", defaults.user_service_url);
            defaults.user_service_url.clone()
        });
        let gateway_url = std::env::var("PAYFLOW_GATEWAY_URL").unwrap_or_else(|_| {
            warn!("🪛️ PAYFLOW_GATEWAY_URL not set, using {} as default", defaults.gateway_url);
            defaults.gateway_url.clone()
        });
        let gateway_server_key = Secret::new(std::env::var("PAYFLOW_GATEWAY_SERVER_KEY").unwrap_or_else(|_| {
            warn!("🪛️ PAYFLOW_GATEWAY_SERVER_KEY not set. Gateway payments will be rejected.");
            String::default()
        }));
        let timeout_ms = parse_env_or(std::env::var("PAYFLOW_CALL_TIMEOUT_MS").ok(), DEFAULT_CALL_TIMEOUT_MS)
            .unwrap_or_else(|(s, default)| {
                warn!("🪛️ Invalid PAYFLOW_CALL_TIMEOUT_MS: {s}. Using {default}ms");
                default
            });
        Self {
            order_service_url,
            user_service_url,
            gateway_url,
            gateway_server_key,
            call_timeout: Duration::from_millis(timeout_ms),
        }
    }
}
