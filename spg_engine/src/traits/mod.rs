//! # Engine seams
//!
//! The engine does not talk to payment providers, storage backends or mail servers directly. Those collaborators are
//! injected through the traits in this module.
//!
//! * [`KeyValueStore`] is the storage contract used by the identity index, the status cache, the side-effect claims
//!   and the order repository. Any keyed store with expiry and per-key atomic insert/compare-and-swap satisfies it.
//! * [`PaymentRail`] issues payment requests and, optionally, answers settlement lookups.
//! * [`Notifier`] receives the "order paid" side effect, at most once per order.
mod key_value_store;
mod notifier;
mod payment_rail;

pub use key_value_store::KeyValueStore;
pub use notifier::Notifier;
pub use payment_rail::{PaymentRail, RailError};
