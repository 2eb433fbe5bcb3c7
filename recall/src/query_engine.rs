use std::sync::Arc;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use tracing::{debug, info};
use vcs_activity_common::{
    event_type, ActivityRecord, ActivityStore, ChartData, StoreResult, TimeRange,
};

use crate::aggregate::count_by_day;

/// Lower bound of the "everything" query: 1971-12-23T18:18:52Z.
pub const EPOCH_SENTINEL_SECS: i64 = 62_360_332;

pub fn epoch_sentinel() -> DateTime<Utc> {
    Utc.timestamp_opt(EPOCH_SENTINEL_SECS, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Reads records back from the store and shapes them for charts.
#[derive(Clone)]
pub struct QueryEngine {
    store: Arc<dyn ActivityStore>,
    offset: FixedOffset,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn ActivityStore>, offset: FixedOffset) -> Self {
        Self { store, offset }
    }

    /// Every record from the epoch sentinel up to now.
    pub async fn get_events(&self) -> StoreResult<Vec<ActivityRecord>> {
        // A clock set before the sentinel sees nothing.
        let Some(range) = TimeRange::new(epoch_sentinel(), Utc::now()) else {
            return Ok(Vec::new());
        };
        self.get_events_in(range).await
    }

    pub async fn get_events_in(&self, range: TimeRange) -> StoreResult<Vec<ActivityRecord>> {
        debug!("Querying {} to {}", range.start(), range.end());
        let records = self.store.query(range).await?;
        info!("Fetched {} activity records", records.len());
        Ok(records)
    }

    pub async fn chart_data(&self) -> StoreResult<ChartData> {
        let events = self.get_events().await?;
        let commits = count_by_day(&events, event_type::COMMIT, &self.offset);
        let pull_requests = count_by_day(&events, event_type::PULL_REQUEST, &self.offset);

        Ok(ChartData {
            commits,
            pull_requests,
            events,
        })
    }
}
