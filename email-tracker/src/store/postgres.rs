use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{FromRow, PgPool, postgres::PgPoolOptions};
use std::str::FromStr;
use uuid::Uuid;

use super::{EmailStore, limit_exceeded, stale_cutoff, validate_address};
use crate::error::{MAX_TRACKED_EMAILS, Result, TrackerError};
use crate::model::{EmailStatus, TrackedEmail};

#[derive(Debug, FromRow)]
struct TrackedEmailRow {
    id: Uuid,
    address: String,
    status: String,
    created_at: DateTime<Utc>
}

impl TryFrom<TrackedEmailRow> for TrackedEmail {
    type Error = TrackerError;

    fn try_from(row: TrackedEmailRow) -> Result<Self> {
        let status = EmailStatus::from_str(&row.status).map_err(|_| {
            TrackerError::Internal(format!(
                "Unknown status '{}' on tracked email {}",
                row.status, row.id
            ))
        })?;

        Ok(Self {
            id: row.id,
            address: row.address,
            status,
            created_at: row.created_at
        })
    }
}

fn into_records(rows: Vec<TrackedEmailRow>) -> Result<Vec<TrackedEmail>> {
    rows.into_iter().map(TrackedEmail::try_from).collect()
}

/// PostgreSQL-backed store.
///
/// Address uniqueness is a table constraint; the record limit is enforced
/// inside a transaction holding a table lock that conflicts with itself, so
/// concurrent inserts are serialized.
#[derive(Clone)]
pub struct PgEmailStore {
    pool: PgPool
}

impl PgEmailStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Creates a store from an existing pool (useful for testing).
    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn initialize_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS tracked_emails (
                id UUID PRIMARY KEY,
                address TEXT NOT NULL UNIQUE,
                status TEXT NOT NULL DEFAULT 'unseen',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_tracked_emails_status_created_at
             ON tracked_emails(status, created_at)"
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl EmailStore for PgEmailStore {
    async fn list_all(&self) -> Result<Vec<TrackedEmail>> {
        let rows: Vec<TrackedEmailRow> = sqlx::query_as(
            "SELECT id, address, status, created_at
             FROM tracked_emails
             ORDER BY created_at DESC"
        )
        .fetch_all(&self.pool)
        .await?;

        into_records(rows)
    }

    async fn add(&self, address: &str) -> Result<TrackedEmail> {
        validate_address(address)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query("LOCK TABLE tracked_emails IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tracked_emails")
            .fetch_one(&mut *tx)
            .await?;
        if count >= MAX_TRACKED_EMAILS {
            return Err(limit_exceeded());
        }

        let record = TrackedEmail::new(address);
        let inserted: Option<TrackedEmailRow> = sqlx::query_as(
            "INSERT INTO tracked_emails (id, address, status, created_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (address) DO NOTHING
             RETURNING id, address, status, created_at"
        )
        .bind(record.id)
        .bind(&record.address)
        .bind(record.status.to_string())
        .bind(record.created_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = inserted else {
            return Err(TrackerError::DuplicateKey {
                address: address.to_string()
            });
        };

        tx.commit().await?;
        tracing::debug!(id = %row.id, "Inserted tracked email");

        TrackedEmail::try_from(row)
    }

    async fn count_all(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tracked_emails")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn find_stale_unseen(&self, threshold_age: Duration) -> Result<Vec<TrackedEmail>> {
        let cutoff = stale_cutoff(threshold_age)?;
        let rows: Vec<TrackedEmailRow> = sqlx::query_as(
            "SELECT id, address, status, created_at
             FROM tracked_emails
             WHERE status = $1 AND created_at < $2"
        )
        .bind(EmailStatus::Unseen.to_string())
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        into_records(rows)
    }

    async fn acknowledge(&self, id: Uuid) -> Result<TrackedEmail> {
        let row: Option<TrackedEmailRow> = sqlx::query_as(
            "UPDATE tracked_emails SET status = $2
             WHERE id = $1
             RETURNING id, address, status, created_at"
        )
        .bind(id)
        .bind(EmailStatus::Seen.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| TrackerError::NotFound { id: id.to_string() })?
            .try_into()
    }
}
