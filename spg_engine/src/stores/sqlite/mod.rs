mod errors;

use std::{fmt::Debug, str::FromStr, time::Duration};

use chrono::Utc;
pub use errors::SqliteStoreError;
use log::*;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};

use crate::traits::KeyValueStore;

// set_if_absent retries when a row expires between the failed insert and the read-back
const MAX_INSERT_ATTEMPTS: usize = 5;

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqliteStoreError> {
    // Every store operation is a single autocommit statement, so waiting out a competing writer is always safe
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(10));
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}

/// A [`KeyValueStore`] persisted in a SQLite database.
///
/// Expiry is evaluated in SQL against the current wall-clock time, so an expired row is invisible to every query even
/// before [`KeyValueStore::purge_expired`] deletes it.
#[derive(Clone)]
pub struct SqliteStore {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteStore ({:?})", self.pool)
    }
}

impl SqliteStore {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteStoreError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub async fn run_migrations(&self) -> Result<(), SqliteStoreError> {
        sqlx::migrate!("./src/stores/sqlite/migrations").run(&self.pool).await?;
        debug!("🗄️ Migrations complete for {}", self.url);
        Ok(())
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn expiry_millis(ttl: Duration) -> i64 {
    let ttl = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    now_millis().saturating_add(ttl)
}

impl KeyValueStore for SqliteStore {
    type Error = SqliteStoreError;

    async fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM kv_entries WHERE key = $1 AND expires_at > $2")
            .bind(key)
            .bind(now_millis())
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), Self::Error> {
        sqlx::query(
            r#"
            INSERT INTO kv_entries (key, value, expires_at) VALUES ($1, $2, $3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(expiry_millis(ttl))
        .execute(&self.pool)
        .await?;
        trace!("🗄️ Set {key}");
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<Option<String>, Self::Error> {
        for _ in 0..MAX_INSERT_ATTEMPTS {
            // An expired row is overwritten in place; a live one blocks the insert
            let result = sqlx::query(
                r#"
                INSERT INTO kv_entries (key, value, expires_at) VALUES ($1, $2, $3)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at
                WHERE kv_entries.expires_at <= $4
                "#,
            )
            .bind(key)
            .bind(value)
            .bind(expiry_millis(ttl))
            .bind(now_millis())
            .execute(&self.pool)
            .await?;
            if result.rows_affected() == 1 {
                return Ok(None);
            }
            if let Some(existing) = self.get(key).await? {
                return Ok(Some(existing));
            }
            trace!("🗄️ {key} expired between insert and read-back. Retrying");
        }
        Err(SqliteStoreError::Contention(key.to_string()))
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new: &str,
        ttl: Duration,
    ) -> Result<bool, Self::Error> {
        match expected {
            None => {
                let result = sqlx::query(
                    r#"
                    INSERT INTO kv_entries (key, value, expires_at) VALUES ($1, $2, $3)
                    ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at
                    WHERE kv_entries.expires_at <= $4
                    "#,
                )
                .bind(key)
                .bind(new)
                .bind(expiry_millis(ttl))
                .bind(now_millis())
                .execute(&self.pool)
                .await?;
                Ok(result.rows_affected() == 1)
            },
            Some(expected) => {
                let result = sqlx::query(
                    r#"
                    UPDATE kv_entries SET value = $1, expires_at = $2
                    WHERE key = $3 AND value = $4 AND expires_at > $5
                    "#,
                )
                .bind(new)
                .bind(expiry_millis(ttl))
                .bind(key)
                .bind(expected)
                .bind(now_millis())
                .execute(&self.pool)
                .await?;
                Ok(result.rows_affected() == 1)
            },
        }
    }

    async fn remove(&self, key: &str) -> Result<bool, Self::Error> {
        let expires_at = sqlx::query_scalar::<_, i64>("DELETE FROM kv_entries WHERE key = $1 RETURNING expires_at")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(expires_at.map(|e| e > now_millis()).unwrap_or(false))
    }

    async fn purge_expired(&self) -> Result<u64, Self::Error> {
        let result =
            sqlx::query("DELETE FROM kv_entries WHERE expires_at <= $1").bind(now_millis()).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
