//! SPG Settlement Engine
//!
//! The engine accepts purchase orders, issues payment requests against interchangeable payment rails, and answers
//! (reliably, and without double side effects) whether a payment has settled. Settlement is learned either from push
//! notifications or from client polls. The two race, pushes are redelivered, and different rails identify the same
//! payment by different aliases. The engine guarantees that:
//!
//! * a paid order never reads as unpaid again, through any of its aliases;
//! * the "order paid" confirmation is dispatched at most once per order.
//!
//! The library is divided into these sections:
//! 1. Data types ([`mod@order_types`], [`mod@catalog`]).
//! 2. The seams to the outside world ([`mod@traits`]): the key-value store, the payment rail and the notifier.
//! 3. Store implementations ([`mod@stores`]): in-memory, and SQLite behind the `sqlite` feature.
//! 4. The engine API ([`mod@spg_api`]), wired together by [`SettlementEngine`].
//!
//! Side effects are published as events ([`mod@events`]); subscribe with [`events::EventHooks`].
pub mod catalog;
pub mod events;
pub mod helpers;
pub mod order_types;
pub mod spg_api;
pub mod stores;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use spg_api::{
    engine::SettlementEngine,
    errors::{
        AliasConflictError,
        IdentityIndexError,
        IssueError,
        OrderFlowError,
        SettlementError,
        SignatureInvalidError,
        StorageError,
        ValidationError,
    },
    order_flow_api::{OrderFlowApi, PlacedOrder},
    order_intake::OrderIntake,
    poll_responder::PollResponder,
    reconciliation::{IngestOutcome, ReconciliationWorker},
    settlement_config::SettlementConfig,
};
#[cfg(feature = "sqlite")]
pub use stores::SqliteStore;
pub use stores::MemoryStore;
