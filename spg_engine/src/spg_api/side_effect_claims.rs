//! At-most-once markers for side effects.
//!
//! Before a confirmation goes out for an order, whoever wants to send it must win `try_claim`. The claim is an atomic
//! insert-if-absent on `claim:<order id>`, so of any number of concurrent or redelivered settlements exactly one wins.
use std::time::Duration;

use chrono::Utc;
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    order_types::OrderId,
    spg_api::{errors::StorageError, keys::claim_key},
    traits::KeyValueStore,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClaimMarker {
    claimed_by: String,
    claimed_at: chrono::DateTime<Utc>,
}

#[derive(Clone)]
pub struct SideEffectClaims<S> {
    store: S,
    ttl: Duration,
}

impl<S: KeyValueStore> SideEffectClaims<S> {
    pub fn new(store: S, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Returns `true` if this call created the claim, i.e. the caller is responsible for the side effect.
    pub async fn try_claim(&self, order_id: &OrderId, claimed_by: &str) -> Result<bool, StorageError> {
        let marker = ClaimMarker { claimed_by: claimed_by.to_string(), claimed_at: Utc::now() };
        let value = serde_json::to_string(&marker)
            .map_err(|e| StorageError::Corrupt { key: claim_key(order_id), reason: e.to_string() })?;
        let existing =
            self.store.set_if_absent(&claim_key(order_id), &value, self.ttl).await.map_err(StorageError::backend)?;
        match existing {
            None => {
                debug!("🎟️ Side effects for order {order_id} claimed by {claimed_by}");
                Ok(true)
            },
            Some(_) => {
                trace!("🎟️ Side effects for order {order_id} were already claimed");
                Ok(false)
            },
        }
    }

    pub async fn is_claimed(&self, order_id: &OrderId) -> Result<bool, StorageError> {
        Ok(self.store.get(&claim_key(order_id)).await.map_err(StorageError::backend)?.is_some())
    }
}
