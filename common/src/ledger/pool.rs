// Sqlite connection pool for the post ledger
//
// The ledger is a local file owned by this single process; durability across
// restarts is the requirement, not cross-process locking.

use crate::config::DatabaseConfig;
use crate::errors::LedgerError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::time::Duration;
use tracing::{info, instrument};

/// Ledger connection pool wrapper
#[derive(Debug, Clone)]
pub struct LedgerPool {
    pool: SqlitePool,
}

impl LedgerPool {
    /// Open (and create if missing) the ledger database file and run the
    /// schema migration
    #[instrument(skip(config), fields(path = %config.path.display()))]
    pub async fn new(config: &DatabaseConfig) -> Result<Self, LedgerError> {
        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .connect_with(options)
            .await
            .map_err(|e| LedgerError::ConnectionFailed(e.to_string()))?;

        let ledger = Self { pool };
        ledger.run_migrations().await?;

        info!(path = %config.path.display(), "Ledger initialized");
        Ok(ledger)
    }

    /// Get a reference to the underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn run_migrations(&self) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS post_records (
                folder_id   TEXT NOT NULL,
                platform    TEXT NOT NULL,
                surface     TEXT NOT NULL,
                status      TEXT NOT NULL,
                error       TEXT,
                recorded_at TEXT NOT NULL,
                PRIMARY KEY (folder_id, platform, surface)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| LedgerError::MigrationFailed(e.to_string()))?;

        Ok(())
    }

    /// Perform a health check on the ledger connection
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), LedgerError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| LedgerError::HealthCheckFailed(e.to_string()))?;
        Ok(())
    }

    /// Close the pool gracefully during shutdown
    #[instrument(skip(self))]
    pub async fn close(&self) {
        info!("Closing ledger pool");
        self.pool.close().await;
    }
}
