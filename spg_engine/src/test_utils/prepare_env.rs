use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::stores::SqliteStore;

/// Creates a fresh SQLite database at `url`, runs the migrations and returns a store connected to it.
pub async fn prepare_test_store(url: &str) -> SqliteStore {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    create_database(url).await;
    let store = SqliteStore::new_with_url(url, 5).await.expect("Error creating connection to database");
    store.run_migrations().await.expect("Error running DB migrations");
    info!("🚀️ Test database ready at {url}");
    store
}

/// A database url inside a fresh temporary directory. Keep the returned directory alive for the duration of the test.
pub fn random_db_path() -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().expect("Error creating temporary directory");
    let url = format!("sqlite://{}/spg_test_{}.db", dir.path().display(), rand::random::<u64>());
    (dir, url)
}

pub async fn create_database(url: &str) {
    if Sqlite::database_exists(url).await.unwrap_or(false) {
        if let Err(e) = Sqlite::drop_database(url).await {
            warn!("🚀️ Error dropping database {url}: {e:?}");
        }
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    debug!("🚀️ Created Sqlite database {url}");
}
