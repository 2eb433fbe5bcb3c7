use super::{ActivityStore, TABLE_NAME};
use crate::error::{StoreError, StoreResult};
use crate::models::{ActivityRecord, TimeRange};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// SQLite backed store.
///
/// Timestamps are stored as fixed-width RFC 3339 text with nanoseconds, so
/// string comparison orders them chronologically and nothing is truncated.
#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    pub async fn new(connection_string: &str) -> StoreResult<Self> {
        let in_memory = is_memory_url(connection_string);

        if !in_memory {
            if let Some(parent) = database_path(connection_string).and_then(|p| p.parent()) {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    info!("Creating parent directory: {:?}", parent);
                    std::fs::create_dir_all(parent)?;
                }
            }
        }

        info!("Connecting to SQLite database: {}", connection_string);
        let options = SqliteConnectOptions::from_str(connection_string)?.create_if_missing(true);

        // Every connection to `:memory:` opens its own empty database, so keep exactly one alive.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options.connect_with(options).await?;

        Ok(Self { pool })
    }

    async fn table_exists(&self) -> StoreResult<bool> {
        let result = sqlx::query("SELECT name FROM sqlite_master WHERE type='table' AND name=?")
            .bind(TABLE_NAME)
            .fetch_optional(&self.pool)
            .await?;
        Ok(result.is_some())
    }
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

fn database_path(url: &str) -> Option<&Path> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    (!path.is_empty()).then(|| Path::new(path))
}

fn encode_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_timestamp(raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Decode(format!("timestamp '{raw}': {e}")))
}

#[async_trait]
impl ActivityStore for SqliteStore {
    async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS vcs_activity (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_type TEXT NOT NULL,
                developer_id TEXT NOT NULL,
                repository_id TEXT NOT NULL,
                branch TEXT NOT NULL,
                status TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_vcs_activity_timestamp
            ON vcs_activity(timestamp);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn append(&self, record: &ActivityRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO vcs_activity
                (timestamp, event_type, developer_id, repository_id, branch, status)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(encode_timestamp(&record.timestamp()))
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
            WHERE timestamp >= ? AND timestamp <= ?
            "#,
        )
        .bind(encode_timestamp(&range.start()))
        .bind(encode_timestamp(&range.end()))
        .fetch_all(&self.pool)
        .await?;

        debug!("Fetched {} rows from {}", rows.len(), TABLE_NAME);

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let timestamp: String = row.try_get("timestamp")?;
            records.push(ActivityRecord::new(
                decode_timestamp(&timestamp)?,
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
