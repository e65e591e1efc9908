use std::{
    collections::HashMap,
    fmt::Debug,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use log::trace;
use thiserror::Error;
use tokio::time::Instant;

use crate::traits::KeyValueStore;

// About a century. Used when `now + ttl` would overflow the clock.
const FOREVER: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

#[derive(Debug, Clone, Error)]
pub enum MemoryStoreError {
    #[error("The store's lock was poisoned by a panicking thread")]
    Poisoned,
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

impl MemoryEntry {
    fn new(value: &str, ttl: Duration) -> Self {
        let now = Instant::now();
        let expires_at = now.checked_add(ttl).unwrap_or_else(|| now + FOREVER);
        Self { value: value.to_string(), expires_at }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// An in-process [`KeyValueStore`]. Clones share the same underlying map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, MemoryEntry>>>,
}

impl Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MemoryStore")
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, MemoryEntry>>, MemoryStoreError> {
        self.entries.lock().map_err(|_| MemoryStoreError::Poisoned)
    }

    /// Returns the live value for `key`, evicting the entry if it has expired.
    fn live_value(map: &mut HashMap<String, MemoryEntry>, key: &str) -> Option<String> {
        let now = Instant::now();
        match map.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.value.clone()),
            Some(_) => {
                trace!("🗄️ Lazily evicting expired entry {key}");
                map.remove(key);
                None
            },
            None => None,
        }
    }

    /// The number of entries held, including expired entries that have not been evicted yet.
    pub fn len(&self) -> usize {
        self.lock().map(|m| m.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    type Error = MemoryStoreError;

    async fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        let mut map = self.lock()?;
        Ok(Self::live_value(&mut map, key))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), Self::Error> {
        let mut map = self.lock()?;
        map.insert(key.to_string(), MemoryEntry::new(value, ttl));
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<Option<String>, Self::Error> {
        let mut map = self.lock()?;
        match Self::live_value(&mut map, key) {
            Some(existing) => Ok(Some(existing)),
            None => {
                map.insert(key.to_string(), MemoryEntry::new(value, ttl));
                Ok(None)
            },
        }
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new: &str,
        ttl: Duration,
    ) -> Result<bool, Self::Error> {
        let mut map = self.lock()?;
        let current = Self::live_value(&mut map, key);
        if current.as_deref() == expected {
            map.insert(key.to_string(), MemoryEntry::new(new, ttl));
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn remove(&self, key: &str) -> Result<bool, Self::Error> {
        let mut map = self.lock()?;
        let now = Instant::now();
        Ok(map.remove(key).map(|e| e.is_live(now)).unwrap_or(false))
    }

    async fn purge_expired(&self) -> Result<u64, Self::Error> {
        let mut map = self.lock()?;
        let now = Instant::now();
        let before = map.len();
        map.retain(|_, e| e.is_live(now));
        Ok((before - map.len()) as u64)
    }
}
