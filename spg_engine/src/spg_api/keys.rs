//! Key layout in the shared key-value store.
use crate::order_types::{Alias, OrderId};

pub fn alias_key(alias: &Alias) -> String {
    format!("alias:{}", alias.as_str())
}

pub fn order_aliases_key(order_id: &OrderId) -> String {
    format!("order-aliases:{}", order_id.as_str())
}

pub fn status_key(alias: &Alias) -> String {
    format!("status:{}", alias.as_str())
}

pub fn claim_key(order_id: &OrderId) -> String {
    format!("claim:{}", order_id.as_str())
}

pub fn order_key(order_id: &OrderId) -> String {
    format!("order:{}", order_id.as_str())
}

/// How many times a read-modify-write loop retries a lost compare-and-swap before giving up.
pub const MAX_CAS_ATTEMPTS: usize = 32;
