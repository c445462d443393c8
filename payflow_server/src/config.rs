use std::{env, time::Duration};

use log::*;
use payflow_common::{parse_boolean_flag, parse_env_or};
use payflow_engine::{events::ConsumerConfig, sqlite_db::db_url, DeliveryPolicy, DEFAULT_OUTBOX_DELAY_SECS};
use service_clients::ServiceClientConfig;

const DEFAULT_PAYFLOW_HOST: &str = "127.0.0.1";
const DEFAULT_PAYFLOW_PORT: u16 = 8084;
const DEFAULT_EVENT_STREAM: &str = "payment_events";
const DEFAULT_ORDER_STATUS_GROUP: &str = "order-status";
const DEFAULT_NOTIFICATION_GROUP: &str = "payment-notifications";
const DEFAULT_RELAY_INTERVAL_MS: u64 = 5_000;
const DEFAULT_PUSH_QUEUE_SIZE: usize = 256;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The event channel broker. When absent, payment events are delivered to in-process consumers only.
    pub redis_url: Option<String>,
    pub channel: ChannelConfig,
    /// Sibling service and payment gateway endpoints
    pub services: ServiceClientConfig,
    /// How often the outbox relay looks for unpublished events
    pub relay_interval: Duration,
    /// How long a payment event may wait to be published by the request that created it before the relay takes over
    pub outbox_delay_secs: i64,
    /// Capacity of the push delivery queue. When it is full, new notifications stay pending.
    pub push_queue_size: usize,
    pub delivery_policy: DeliveryPolicy,
    /// If true, gateway notifications must carry a valid `signature_key`.
    pub webhook_signature_checks: bool,
}

/// Stream and consumer-group names on the event channel.
#[derive(Clone, Debug)]
pub struct ChannelConfig {
    pub stream: String,
    pub order_status_group: String,
    pub notification_group: String,
    pub consumer_name: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            stream: DEFAULT_EVENT_STREAM.to_string(),
            order_status_group: DEFAULT_ORDER_STATUS_GROUP.to_string(),
            notification_group: DEFAULT_NOTIFICATION_GROUP.to_string(),
            consumer_name: format!("payflow-{}", std::process::id()),
        }
    }
}

impl ChannelConfig {
    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let stream = env::var("PAYFLOW_EVENT_STREAM").unwrap_or_else(|_| {
            info!("🪛️ PAYFLOW_EVENT_STREAM is not set. Using '{}'", defaults.stream);
            defaults.stream.clone()
        });
        let order_status_group = env::var("PAYFLOW_ORDER_STATUS_GROUP").unwrap_or(defaults.order_status_group);
        let notification_group = env::var("PAYFLOW_NOTIFICATION_GROUP").unwrap_or(defaults.notification_group);
        let consumer_name = env::var("PAYFLOW_CONSUMER_NAME").unwrap_or_else(|_| {
            info!("🪛️ PAYFLOW_CONSUMER_NAME is not set. This consumer is '{}'", defaults.consumer_name);
            defaults.consumer_name.clone()
        });
        Self { stream, order_status_group, notification_group, consumer_name }
    }

    pub fn order_status_consumer(&self) -> ConsumerConfig {
        ConsumerConfig::new(self.stream.as_str(), self.order_status_group.as_str(), self.consumer_name.as_str())
    }

    pub fn notification_consumer(&self) -> ConsumerConfig {
        ConsumerConfig::new(self.stream.as_str(), self.notification_group.as_str(), self.consumer_name.as_str())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_PAYFLOW_HOST.to_string(),
            port: DEFAULT_PAYFLOW_PORT,
            database_url: String::default(),
            redis_url: None,
            channel: ChannelConfig::default(),
            services: ServiceClientConfig::default(),
            relay_interval: Duration::from_millis(DEFAULT_RELAY_INTERVAL_MS),
            outbox_delay_secs: DEFAULT_OUTBOX_DELAY_SECS,
            push_queue_size: DEFAULT_PUSH_QUEUE_SIZE,
            delivery_policy: DeliveryPolicy::default(),
            webhook_signature_checks: true,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("PAYFLOW_HOST").ok().unwrap_or_else(|| DEFAULT_PAYFLOW_HOST.into());
        let port = parse_env_or(env::var("PAYFLOW_PORT").ok(), DEFAULT_PAYFLOW_PORT).unwrap_or_else(|(s, default)| {
            error!("🪛️ {s} is not a valid port for PAYFLOW_PORT. Using the default, {default}, instead.");
            default
        });
        let database_url = db_url();
        let redis_url = env::var("PAYFLOW_REDIS_URL").ok().filter(|s| !s.is_empty());
        if redis_url.is_none() {
            warn!(
                "🪛️ PAYFLOW_REDIS_URL is not set. Payment events will only reach consumers in this process, and will \
                 not survive a restart."
            );
        }
        let channel = ChannelConfig::from_env_or_default();
        let services = ServiceClientConfig::new_from_env_or_default();
        let relay_ms = parse_env_or(env::var("PAYFLOW_RELAY_INTERVAL_MS").ok(), DEFAULT_RELAY_INTERVAL_MS)
            .unwrap_or_else(|(s, default)| {
                warn!("🪛️ Invalid PAYFLOW_RELAY_INTERVAL_MS: {s}. Using {default}ms");
                default
            });
        let outbox_delay_secs = parse_env_or(env::var("PAYFLOW_OUTBOX_DELAY_SECS").ok(), DEFAULT_OUTBOX_DELAY_SECS)
            .unwrap_or_else(|(s, default)| {
                warn!("🪛️ Invalid PAYFLOW_OUTBOX_DELAY_SECS: {s}. Using {default}s");
                default
            });
        let push_queue_size = parse_env_or(env::var("PAYFLOW_PUSH_QUEUE_SIZE").ok(), DEFAULT_PUSH_QUEUE_SIZE)
            .unwrap_or_else(|(s, default)| {
                warn!("🪛️ Invalid PAYFLOW_PUSH_QUEUE_SIZE: {s}. Using {default}");
                default
            });
        let assume_sent = parse_boolean_flag(env::var("PAYFLOW_ASSUME_SENT").ok(), true);
        let delivery_policy = DeliveryPolicy::from_assume_sent_flag(assume_sent);
        info!("🪛️ Push delivery policy: {delivery_policy:?}");
        let mut webhook_signature_checks =
            parse_boolean_flag(env::var("PAYFLOW_WEBHOOK_SIGNATURE_CHECKS").ok(), true);
        if webhook_signature_checks && services.gateway_server_key.reveal().is_empty() {
            warn!("🚨️ No gateway server key is configured, so gateway notification signatures cannot be checked.");
            webhook_signature_checks = false;
        }
        Self {
            host,
            port,
            database_url,
            redis_url,
            channel,
            services,
            relay_interval: Duration::from_millis(relay_ms),
            outbox_delay_secs,
            push_queue_size,
            delivery_policy,
            webhook_signature_checks,
        }
    }
}
