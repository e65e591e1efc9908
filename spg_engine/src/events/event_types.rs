use serde::{Deserialize, Serialize};

use crate::order_types::{Order, SettlementDetails};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
    pub details: SettlementDetails,
}

impl OrderPaidEvent {
    pub fn new(order: Order, details: SettlementDetails) -> Self {
        Self { order, details }
    }
}
