//! HTTP clients for the services the payment engine collaborates with.
//!
//! * [`OrderServiceApi`] and [`UserServiceApi`] talk to sibling services. Both answer with a `{"data": ...}` envelope.
//! * [`SnapGatewayApi`] opens transactions on a Snap-style payment gateway.
//! * [`SiblingServices`] bundles the sibling clients and implements the engine's collaborator traits.
//!
//! None of the clients retry. Every failure is handed back to the caller.
mod api;
mod config;
mod data_objects;
mod error;
mod gateway;
mod helpers;
mod order_service;
mod services;
mod user_service;

pub use api::ServiceClient;
pub use config::{ServiceClientConfig, DEFAULT_CALL_TIMEOUT_MS};
pub use data_objects::{
    CustomerDetails,
    DataEnvelope,
    OrderPaymentStatusUpdate,
    PublicOrder,
    SnapTransactionRequest,
    SnapTransactionResponse,
    TransactionDetails,
};
pub use error::ServiceClientError;
pub use gateway::SnapGatewayApi;
pub use order_service::OrderServiceApi;
pub use services::SiblingServices;
pub use user_service::UserServiceApi;
