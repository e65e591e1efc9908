//! Time-bounded settlement status per alias.
//!
//! `paid` is sticky. Once any alias of an order has been observed `paid`, every sibling alias reads `paid` too, and
//! no later `pending` observation (a stale poll, a redelivered "created" push) can take it back. All writes go
//! through a compare-and-swap loop, so racing observers never interleave a regression.
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::*;

use crate::{
    order_types::{Alias, SettlementStatus, StatusEntry},
    spg_api::{
        errors::{IdentityIndexError, StorageError},
        identity_index::IdentityIndex,
        keys::{status_key, MAX_CAS_ATTEMPTS},
    },
    traits::KeyValueStore,
};

#[derive(Clone)]
pub struct StatusCache<S> {
    store: S,
    index: IdentityIndex<S>,
    status_ttl: Duration,
    paid_ttl: Duration,
}

impl<S: KeyValueStore> StatusCache<S> {
    /// `paid_ttl` is the lifetime of `paid` entries. It should be at least `status_ttl`.
    pub fn new(store: S, index: IdentityIndex<S>, status_ttl: Duration, paid_ttl: Duration) -> Self {
        Self { store, index, status_ttl, paid_ttl: paid_ttl.max(status_ttl) }
    }

    /// The current status for the alias. Never-observed and expired aliases read as `unknown`.
    pub async fn read(&self, alias: &Alias) -> Result<SettlementStatus, StorageError> {
        Ok(self.read_entry(alias).await?.map(|(_, entry)| entry.status).unwrap_or_default())
    }

    /// Records an observation and returns the status that is now stored for the alias.
    ///
    /// Observing `unknown` is a no-op. Observing `pending` on an alias whose order is already paid records `paid`.
    /// Observing `paid` marks every sibling alias `paid` as well.
    pub async fn observe(
        &self,
        alias: &Alias,
        status: SettlementStatus,
        observed_at: DateTime<Utc>,
    ) -> Result<SettlementStatus, StorageError> {
        if status == SettlementStatus::Unknown {
            return self.read(alias).await;
        }
        let siblings = self.index.siblings_of(alias).await.map_err(index_error)?;
        let mut effective = status;
        if status == SettlementStatus::Pending {
            for sibling in siblings.iter().filter(|s| *s != alias) {
                if self.read(sibling).await? == SettlementStatus::Paid {
                    debug!("🗂️ {alias} observed pending, but sibling {sibling} is already paid");
                    effective = SettlementStatus::Paid;
                    break;
                }
            }
        }
        let recorded = self.write_monotonic(alias, effective, observed_at).await?;
        if recorded == SettlementStatus::Paid {
            for sibling in siblings.iter().filter(|s| *s != alias) {
                self.write_monotonic(sibling, SettlementStatus::Paid, observed_at).await?;
            }
        }
        Ok(recorded)
    }

    async fn read_entry(&self, alias: &Alias) -> Result<Option<(String, StatusEntry)>, StorageError> {
        let key = status_key(alias);
        let Some(raw) = self.store.get(&key).await.map_err(StorageError::backend)? else {
            return Ok(None);
        };
        match serde_json::from_str::<StatusEntry>(&raw) {
            Ok(entry) => Ok(Some((raw, entry))),
            Err(e) => {
                // A garbled entry must not wedge the alias forever. Treat it as unknown and let the next write win.
                error!("🗂️ Status entry {key} is unreadable and will be overwritten. {e}");
                Ok(None)
            },
        }
    }

    async fn write_monotonic(
        &self,
        alias: &Alias,
        status: SettlementStatus,
        observed_at: DateTime<Utc>,
    ) -> Result<SettlementStatus, StorageError> {
        let key = status_key(alias);
        let ttl = if status == SettlementStatus::Paid { self.paid_ttl } else { self.status_ttl };
        let new_entry = StatusEntry { status, updated_at: observed_at };
        let new_value =
            serde_json::to_string(&new_entry).map_err(|e| StorageError::Corrupt { key: key.clone(), reason: e.to_string() })?;
        for _ in 0..MAX_CAS_ATTEMPTS {
            let raw = self.store.get(&key).await.map_err(StorageError::backend)?;
            let current = raw.as_deref().and_then(|r| serde_json::from_str::<StatusEntry>(r).ok());
            if let Some(entry) = &current {
                if entry.status == SettlementStatus::Paid {
                    if status != SettlementStatus::Paid {
                        debug!("🗂️ Ignoring {status} for {alias}. It is already paid");
                    }
                    return Ok(SettlementStatus::Paid);
                }
            }
            let swapped = self
                .store
                .compare_and_swap(&key, raw.as_deref(), &new_value, ttl)
                .await
                .map_err(StorageError::backend)?;
            if swapped {
                trace!("🗂️ {alias} is now {status}");
                return Ok(status);
            }
            trace!("🗂️ Concurrent update of {key}. Retrying");
        }
        Err(StorageError::Contention(key))
    }
}

fn index_error(e: IdentityIndexError) -> StorageError {
    match e {
        IdentityIndexError::Storage(s) => s,
        IdentityIndexError::AliasConflict(c) => StorageError::Backend(c.to_string()),
    }
}
