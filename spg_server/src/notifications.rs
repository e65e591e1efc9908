use log::*;
use spg_engine::{
    order_types::{Order, SettlementDetails},
    traits::Notifier,
};

/// Writes order confirmations to the log, under the `spg::confirmations` target.
///
/// Mail delivery is out of scope for the server. Point a log shipper at this target, or replace this notifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, order: &Order, details: &SettlementDetails) {
        info!(
            target: "spg::confirmations",
            "✉️ Order {} paid via {} ({}, alias {}, {}). {} x {} for {} <{}>, total €{}",
            order.order_id,
            details.payment_method,
            details.source,
            details.alias,
            details.settled_at.to_rfc3339(),
            order.quantity,
            order.product,
            order.customer.name,
            order.customer.email,
            order.total_price.to_decimal_string(),
        );
    }
}
