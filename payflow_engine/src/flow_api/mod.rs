pub mod connection_registry;
pub mod consumers;
pub mod errors;
pub mod notification_api;
pub mod outbox_relay;
pub mod payment_flow_api;
