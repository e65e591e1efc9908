//! Key-value store backends.
//!
//! * [`MemoryStore`] keeps everything in process memory. Entries expire on the tokio clock, so tests can pause and
//!   advance time. State is lost on restart, which makes it suitable for tests and single-instance deployments only.
//! * [`SqliteStore`] persists entries with sqlx, and survives restarts.
mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::{MemoryStore, MemoryStoreError};
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteStore, SqliteStoreError};
