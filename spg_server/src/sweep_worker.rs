use std::time::Duration;

use log::*;
use spg_engine::traits::KeyValueStore;
use tokio::task::JoinHandle;

/// Starts the store sweep worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Expired entries are already invisible to every read. The sweep only reclaims the space they take up.
pub fn start_sweep_worker<S: KeyValueStore>(store: S, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        info!("🕰️ Store sweep worker started. Running every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            trace!("🕰️ Running store sweep");
            match store.purge_expired().await {
                Ok(0) => trace!("🕰️ Nothing to sweep"),
                Ok(count) => info!("🕰️ {count} expired entries purged"),
                Err(e) => error!("🕰️ Error running store sweep: {e}"),
            }
        }
    })
}
