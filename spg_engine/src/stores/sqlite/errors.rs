use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqliteStoreError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Could not run database migrations: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("Entry {0} kept changing while trying to insert it")]
    Contention(String),
}
