use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Event type tags written into `ActivityRecord::event_type`.
///
/// This is an open set: records read back from the store may carry tags that
/// are not listed here.
pub mod event_type {
    pub const COMMIT: &str = "Commit";
    pub const PULL_REQUEST: &str = "Pull Request";
    pub const BRANCH_CREATION: &str = "Branch Creation";
    pub const BRANCH_DELETION: &str = "Branch Deletion";
}

/// Branch reported for commits, since the commit list endpoint has none.
pub const DEFAULT_BRANCH: &str = "main";

/// Status given to activity the upstream reports without one.
pub const STATUS_SUCCESS: &str = "Success";

/// One normalized piece of repository activity.
///
/// Records are immutable: every field is supplied to [`ActivityRecord::new`]
/// and only read afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    timestamp: DateTime<Utc>,
    event_type: String,
    developer_id: String,
    repository_id: String,
    branch: String,
    status: String,
}

impl ActivityRecord {
    pub fn new(
        timestamp: DateTime<Utc>,
        event_type: impl Into<String>,
        developer_id: impl Into<String>,
        repository_id: impl Into<String>,
        branch: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            event_type: event_type.into(),
            developer_id: developer_id.into(),
            repository_id: repository_id.into(),
            branch: branch.into(),
            status: status.into(),
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn developer_id(&self) -> &str {
        &self.developer_id
    }

    pub fn repository_id(&self) -> &str {
        &self.repository_id
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn is(&self, event_type: &str) -> bool {
        self.event_type == event_type
    }
}

/// Per-day counts keyed by `YYYY-MM-DD`.
pub type DayCounts = BTreeMap<String, u64>;

/// Everything a chart render needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub commits: DayCounts,
    pub pull_requests: DayCounts,
    pub events: Vec<ActivityRecord>,
}

/// The (owner, repository) pair a collector polls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoTarget {
    pub owner: String,
    pub name: String,
}

impl RepoTarget {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Inclusive time range used for store queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    /// Returns `None` when `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        *timestamp >= self.start && *timestamp <= self.end
    }
}

/// The three upstream shapes a collection cycle reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Commits,
    PullRequests,
    Events,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Commits => "commits",
            SourceKind::PullRequests => "pull requests",
            SourceKind::Events => "events",
        };
        f.write_str(name)
    }
}
