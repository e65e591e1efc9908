//! # Settlement engine API
//!
//! The components below are plain structs over an injected [`KeyValueStore`](crate::traits::KeyValueStore) and
//! [`PaymentRail`](crate::traits::PaymentRail). [`SettlementEngine`] wires them together; most callers only need it.
//!
//! * [`order_intake`] validates purchase requests and prices them from the catalog.
//! * [`payment_issuer`] asks the rail for a payment request and registers its aliases.
//! * [`identity_index`] maps every alias back to its order.
//! * [`status_cache`] holds the monotonic, expiring settlement status per alias.
//! * [`side_effect_claims`] makes the "order paid" confirmation at-most-once.
//! * [`reconciliation`] ingests push notifications.
//! * [`poll_responder`] answers client polls.
//! * [`order_flow_api`] is the checkout pipeline behind `POST /orders`.
pub mod engine;
pub mod errors;
pub mod identity_index;
mod keys;
pub mod order_flow_api;
pub mod order_intake;
pub mod order_repository;
pub mod payment_issuer;
pub mod poll_responder;
pub mod reconciliation;
pub mod settlement_config;
pub mod side_effect_claims;
pub mod status_cache;
