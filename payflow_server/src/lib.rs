//! # Payflow server
//! This crate hosts the HTTP server for the payment service. It is responsible for:
//! * Recording payments for orders and opening gateway transactions for them.
//! * Receiving payment status notifications from the gateway.
//! * Serving notifications, and pushing new ones to connected users over server-sent events.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/webhook/payments`: Payment status notifications from the gateway.
//! * `/api/payments`: `POST` to pay for an order, `GET` to list payments.
//! * `/api/payments/{id}` and `/api/payments/order/{code}`: A single payment, with its order and customer details.
//! * `/api/notifications`: The caller's notifications.
//! * `/api/notifications/stream`: Live push notifications for the caller.
//! * `/api/notifications/{id}` and `/api/notifications/{id}/read`: Fetch a notification, or mark it as read.
//!
//! Every `/api` route expects the caller identity in the `X-Caller-Identity` header.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod push_stream;
pub mod routes;
pub mod server;
pub mod workers;

#[cfg(test)]
mod endpoint_tests;
