//! Settlement events and the hooks that react to them.
//!
//! The reconciliation worker publishes an [`OrderPaidEvent`] exactly once per order, after winning the side-effect
//! claim. Anything that needs to react to a payment (confirmation mails, fulfilment, analytics) subscribes through
//! [`EventHooks`] and never runs inside the webhook request itself.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
