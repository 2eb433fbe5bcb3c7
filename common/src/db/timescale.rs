use super::{ActivityStore, TABLE_NAME};
use crate::error::{StoreError, StoreResult};
use crate::models::{ActivityRecord, TimeRange};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres, Row};
use tracing::{debug, info};

/// TimescaleDB (PostgreSQL) backed store.
///
/// Timestamps are kept as `TIMESTAMPTZ`, which has microsecond precision.
#[derive(Clone)]
pub struct TimescaleStore {
    pool: Pool<Postgres>,
}

impl TimescaleStore {
    pub async fn new(connection_string: &str) -> StoreResult<Self> {
        info!("Connecting to time-series database");
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(connection_string)
            .await?;
        Ok(Self { pool })
    }

    async fn table_exists(&self) -> StoreResult<bool> {
        let row = sqlx::query("SELECT to_regclass($1)::text AS name")
            .bind(TABLE_NAME)
            .fetch_one(&self.pool)
            .await?;
        let name: Option<String> = row.try_get("name")?;
        Ok(name.is_some())
    }
}

#[async_trait]
impl ActivityStore for TimescaleStore {
    async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS vcs_activity (
                id BIGSERIAL PRIMARY KEY,
                timestamp TIMESTAMPTZ NOT NULL,
                event_type TEXT NOT NULL,
                developer_id TEXT NOT NULL,
                repository_id TEXT NOT NULL,
                branch TEXT NOT NULL,
                status TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Separate statement; Postgres will not prepare two at once.
        sqlx::query("CREATE INDEX IF NOT EXISTS vcs_activity_timestamp_idx ON vcs_activity (timestamp)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn append(&self, record: &ActivityRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO vcs_activity (timestamp, event_type, developer_id, repository_id, branch, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(record.timestamp())
        .bind(record.event_type())
        .bind(record.developer_id())
        .bind(record.repository_id())
        .bind(record.branch())
        .bind(record.status())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn query(&self, range: TimeRange) -> StoreResult<Vec<ActivityRecord>> {
        if !self.table_exists().await? {
            return Err(StoreError::ContainerNotFound(TABLE_NAME.to_string()));
        }

        let rows = sqlx::query(
            r#"
            SELECT timestamp, event_type, developer_id, repository_id, branch, status
            FROM vcs_activity
            WHERE timestamp >= $1 AND timestamp <= $2
            "#,
        )
        .bind(range.start())
        .bind(range.end())
        .fetch_all(&self.pool)
        .await?;

        debug!("Fetched {} rows from {}", rows.len(), TABLE_NAME);

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let timestamp: DateTime<Utc> = row.try_get("timestamp")?;
            records.push(ActivityRecord::new(
                timestamp,
                row.try_get::<String, _>("event_type")?,
                row.try_get::<String, _>("developer_id")?,
                row.try_get::<String, _>("repository_id")?,
                row.try_get::<String, _>("branch")?,
                row.try_get::<String, _>("status")?,
            ));
        }

        Ok(records)
    }
}
