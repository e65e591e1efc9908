use crate::order_types::{Order, SettlementDetails};

/// Receives the "order paid" side effect. The engine guarantees at most one call per order.
///
/// Implementations must not block for long: they are called from the event handler task. Failures are the
/// notifier's own business and never flow back into webhook acknowledgement.
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, order: &Order, details: &SettlementDetails);
}
