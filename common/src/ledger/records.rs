// Post record repository
//
// One row per (folder_id, platform, surface). Rows are created on every
// publish attempt and updated in place by an idempotent upsert; a row that
// has reached Posted is terminal and is never overwritten.

use crate::errors::LedgerError;
use crate::ledger::LedgerPool;
use crate::models::{Platform, PostRecord, PostStatus, Surface, Target};
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::collections::HashSet;
use tracing::{debug, instrument};

/// Repository for ledger rows
pub struct PostRecordRepository {
    pool: LedgerPool,
}

impl PostRecordRepository {
    pub fn new(pool: LedgerPool) -> Self {
        Self { pool }
    }

    /// Idempotent upsert keyed by (folder_id, platform, surface). A Posted
    /// row never changes status again; everything else takes the new value.
    #[instrument(skip(self, error))]
    pub async fn record(
        &self,
        folder_id: &str,
        platform: Platform,
        surface: Surface,
        status: PostStatus,
        error: Option<&str>,
    ) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO post_records (folder_id, platform, surface, status, error, recorded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT (folder_id, platform, surface) DO UPDATE SET
                status = excluded.status,
                error = excluded.error,
                recorded_at = excluded.recorded_at
            WHERE post_records.status <> 'posted'
            "#,
        )
        .bind(folder_id)
        .bind(platform.to_string())
        .bind(surface.to_string())
        .bind(status.to_string())
        .bind(error)
        .bind(Utc::now())
        .execute(self.pool.pool())
        .await?;

        debug!(
            folder_id = folder_id,
            platform = %platform,
            surface = %surface,
            status = %status,
            "Post record upserted"
        );
        Ok(())
    }

    /// True only when the tuple has a Posted record
    #[instrument(skip(self))]
    pub async fn has_posted(
        &self,
        folder_id: &str,
        platform: Platform,
        surface: Surface,
    ) -> Result<bool, LedgerError> {
        let row = sqlx::query(
            r#"
            SELECT 1 FROM post_records
            WHERE folder_id = ?1 AND platform = ?2 AND surface = ?3 AND status = 'posted'
            "#,
        )
        .bind(folder_id)
        .bind(platform.to_string())
        .bind(surface.to_string())
        .fetch_optional(self.pool.pool())
        .await?;

        Ok(row.is_some())
    }

    /// Targets of a folder that need no further attempts (Posted or Skipped)
    #[instrument(skip(self))]
    pub async fn settled_targets(&self, folder_id: &str) -> Result<HashSet<Target>, LedgerError> {
        let rows = sqlx::query(
            r#"
            SELECT platform, surface FROM post_records
            WHERE folder_id = ?1 AND status IN ('posted', 'skipped')
            "#,
        )
        .bind(folder_id)
        .fetch_all(self.pool.pool())
        .await?;

        let mut targets = HashSet::new();
        for row in rows {
            let platform: String = row.get("platform");
            let surface: String = row.get("surface");
            targets.insert(Target {
                platform: platform.parse().map_err(LedgerError::InvalidStatus)?,
                surface: surface.parse().map_err(LedgerError::InvalidStatus)?,
            });
        }
        Ok(targets)
    }

    /// Full attempt history for one folder, for logging and inspection
    #[instrument(skip(self))]
    pub async fn records_for(&self, folder_id: &str) -> Result<Vec<PostRecord>, LedgerError> {
        let rows = sqlx::query(
            r#"
            SELECT folder_id, platform, surface, status, error, recorded_at
            FROM post_records
            WHERE folder_id = ?1
            ORDER BY platform, surface
            "#,
        )
        .bind(folder_id)
        .fetch_all(self.pool.pool())
        .await?;

        rows.into_iter()
            .map(|row| {
                let platform: String = row.get("platform");
                let surface: String = row.get("surface");
                let status: String = row.get("status");
                let recorded_at: DateTime<Utc> = row.get("recorded_at");
                Ok(PostRecord {
                    folder_id: row.get("folder_id"),
                    platform: platform.parse().map_err(LedgerError::InvalidStatus)?,
                    surface: surface.parse().map_err(LedgerError::InvalidStatus)?,
                    status: status.parse().map_err(LedgerError::InvalidStatus)?,
                    error: row.get("error"),
                    recorded_at,
                })
            })
            .collect()
    }

    /// Count of distinct folders carrying at least one Posted record
    #[instrument(skip(self))]
    pub async fn posted_folder_count(&self) -> Result<i64, LedgerError> {
        let row = sqlx::query(
            "SELECT COUNT(DISTINCT folder_id) AS n FROM post_records WHERE status = 'posted'",
        )
        .fetch_one(self.pool.pool())
        .await?;
        Ok(row.get("n"))
    }
}
