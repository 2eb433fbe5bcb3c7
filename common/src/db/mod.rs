use crate::error::{StoreError, StoreResult};
use crate::models::{ActivityRecord, TimeRange};
use async_trait::async_trait;
use std::sync::Arc;

mod sqlite_db;
mod timescale;

pub use sqlite_db::*;
pub use timescale::*;

/// Name of the table (time-series container) holding activity records.
pub const TABLE_NAME: &str = "vcs_activity";

/// Append-only, timestamp-keyed activity storage.
///
/// Rows are keyed by a surrogate id, so any number of records may share a
/// timestamp. `query` on a store whose table was never created returns
/// [`StoreError::ContainerNotFound`].
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Creates the table and its timestamp index if they are missing.
    async fn ensure_schema(&self) -> StoreResult<()>;

    async fn append(&self, record: &ActivityRecord) -> StoreResult<()>;

    /// Every record with `start <= timestamp <= end`, in no particular order.
    async fn query(&self, range: TimeRange) -> StoreResult<Vec<ActivityRecord>>;
}

/// Opens the store named by `url`: `postgres://`/`postgresql://` for
/// TimescaleDB, `sqlite:` for SQLite.
pub async fn connect(url: &str) -> StoreResult<Arc<dyn ActivityStore>> {
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        Ok(Arc::new(TimescaleStore::new(url).await?))
    } else if url.starts_with("sqlite:") {
        Ok(Arc::new(SqliteStore::new(url).await?))
    } else {
        Err(StoreError::UnsupportedUrl(url.to_string()))
    }
}
