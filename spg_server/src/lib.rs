//! # SPG server
//! This crate hosts the HTTP surface of the settlement payment gateway. It is responsible for:
//! * Accepting purchase orders and returning payment instructions.
//! * Answering client polls about whether a payment has settled.
//! * Receiving settlement pushes from the payment rails.
//!
//! All of the actual work happens in [`spg_engine`]; the rails themselves live in [`spg_rails`].
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `GET /health`: A health check route that returns a 200 OK response.
//! * `POST /orders`: Creates an order and requests its payment.
//! * `POST /payments/status`: The settlement status of a payment alias.
//! * `POST /webhooks/settlement?rail=lightning|ideal`: Settlement pushes from the payment rails.
//!
//! Any other method on these paths returns 405.
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod notifications;
pub mod routes;
pub mod server;
pub mod sweep_worker;

#[cfg(test)]
mod endpoint_tests;
