//! Thin adapters between the settlement engine and the payment providers it uses.
//!
//! * [`MollieRail`] creates iDEAL payments through the Mollie v2 API and looks up their status.
//! * [`LnbitsRail`] creates Lightning invoices on an LNbits wallet and looks up whether they were paid.
//! * [`RailRouter`] implements the engine's [`PaymentRail`](spg_engine::traits::PaymentRail) trait by routing on the
//!   order's payment method.
//!
//! Everything provider-specific (endpoints, request bodies, response shapes) stays in this crate.
mod config;
mod error;
mod exchange_rate;
mod lnbits;
mod mollie;
mod rest_client;
mod router;

pub use config::{LnbitsConfig, MollieConfig, RailsConfig};
pub use error::RailApiError;
pub use exchange_rate::{euro_cents_to_sats, ExchangeRateSource, FixedExchangeRate};
pub use lnbits::LnbitsRail;
pub use mollie::MollieRail;
pub use router::RailRouter;
