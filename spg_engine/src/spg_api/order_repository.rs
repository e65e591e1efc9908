use std::time::Duration;

use chrono::Utc;
use log::*;

use crate::{
    order_types::{Order, OrderId, OrderStatusType},
    spg_api::{
        errors::StorageError,
        keys::{order_key, MAX_CAS_ATTEMPTS},
    },
    traits::KeyValueStore,
};

/// Working-storage persistence for orders. Orders expire after the retention window; they are never deleted.
#[derive(Clone)]
pub struct OrderRepository<S> {
    store: S,
    retention: Duration,
}

impl<S: KeyValueStore> OrderRepository<S> {
    pub fn new(store: S, retention: Duration) -> Self {
        Self { store, retention }
    }

    pub async fn save(&self, order: &Order) -> Result<(), StorageError> {
        let key = order_key(&order.order_id);
        let value = encode(&key, order)?;
        match self.store.set_if_absent(&key, &value, self.retention).await.map_err(StorageError::backend)? {
            None => {
                debug!("📦️ Order {} saved", order.order_id);
                Ok(())
            },
            Some(_) => Err(StorageError::DuplicateOrder(order.order_id.clone())),
        }
    }

    pub async fn fetch(&self, order_id: &OrderId) -> Result<Option<Order>, StorageError> {
        let key = order_key(order_id);
        match self.store.get(&key).await.map_err(StorageError::backend)? {
            Some(raw) => Ok(Some(decode(&key, &raw)?)),
            None => Ok(None),
        }
    }

    /// Moves the order forward to `next` and returns the stored order.
    ///
    /// Transitions that would not move the status forward leave the order untouched, so marking an order `paid` twice
    /// is harmless.
    pub async fn transition(&self, order_id: &OrderId, next: OrderStatusType) -> Result<Order, StorageError> {
        let key = order_key(order_id);
        for _ in 0..MAX_CAS_ATTEMPTS {
            let raw = self
                .store
                .get(&key)
                .await
                .map_err(StorageError::backend)?
                .ok_or_else(|| StorageError::OrderNotFound(order_id.clone()))?;
            let mut order = decode(&key, &raw)?;
            if !order.status.can_transition_to(next) {
                trace!("📦️ Order {order_id} is already {}. Not moving it to {next}", order.status);
                return Ok(order);
            }
            order.status = next;
            order.updated_at = Utc::now();
            let value = encode(&key, &order)?;
            if self.store.compare_and_swap(&key, Some(&raw), &value, self.retention).await.map_err(StorageError::backend)? {
                info!("📦️ Order {order_id} is now {next}");
                return Ok(order);
            }
            trace!("📦️ Concurrent update of order {order_id}. Retrying");
        }
        Err(StorageError::Contention(key))
    }
}

fn encode(key: &str, order: &Order) -> Result<String, StorageError> {
    serde_json::to_string(order).map_err(|e| StorageError::Corrupt { key: key.to_string(), reason: e.to_string() })
}

fn decode(key: &str, raw: &str) -> Result<Order, StorageError> {
    serde_json::from_str(raw).map_err(|e| StorageError::Corrupt { key: key.to_string(), reason: e.to_string() })
}
