use std::{future::Future, time::Duration};

/// A keyed string store with per-entry expiry.
///
/// Expired entries must behave exactly like absent entries for every operation, whether or not they have been
/// physically removed yet. All operations are atomic per key; no cross-key transactions are required.
pub trait KeyValueStore: Clone + Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetches the live value for `key`, or `None` if it is absent or expired.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send;

    /// Unconditionally stores `value` under `key`, replacing any previous value and its expiry.
    fn set(&self, key: &str, value: &str, ttl: Duration) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Stores `value` only if there is no live entry for `key`.
    ///
    /// Returns `None` if the value was stored, or `Some(existing)` with the live value that prevented the insert.
    fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send;

    /// Replaces the live value for `key` with `new` if, and only if, it currently equals `expected`.
    /// `expected == None` means "there is no live entry".
    ///
    /// Returns `true` if the swap happened.
    fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Removes the entry for `key`. Returns `true` if a live entry was removed.
    fn remove(&self, key: &str) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Physically deletes all expired entries and returns how many were removed.
    fn purge_expired(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send;
}
