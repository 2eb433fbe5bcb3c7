use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use vcs_activity_common::github::adapters::{map_branch_events, map_commits, map_pull_requests};
use vcs_activity_common::{
    ActivityRecord, ActivitySource, ActivityStore, RepoTarget, SourceError, SourceKind,
    StoreResult,
};

/// Outcome of one collection cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub commits: usize,
    pub pull_requests: usize,
    pub branch_events: usize,
    pub appended: usize,
    pub failed_sources: Vec<SourceKind>,
}

impl CycleReport {
    pub fn mapped(&self) -> usize {
        self.commits + self.pull_requests + self.branch_events
    }
}

/// Pulls one page of each upstream shape for a repository and appends the
/// resulting records to the store.
pub struct Collector {
    source: Arc<dyn ActivitySource>,
    store: Arc<dyn ActivityStore>,
    target: RepoTarget,
}

impl Collector {
    pub fn new(
        source: Arc<dyn ActivitySource>,
        store: Arc<dyn ActivityStore>,
        target: RepoTarget,
    ) -> Self {
        Collector {
            source,
            store,
            target,
        }
    }

    pub fn target(&self) -> &RepoTarget {
        &self.target
    }

    /// Runs a single cycle.
    ///
    /// A failed fetch only costs that source's records. A store failure ends
    /// the cycle; records appended before it stay in the store.
    pub async fn collect_once(&self) -> StoreResult<CycleReport> {
        info!("Collecting activity for {}", self.target);

        let (commits, pulls, events) = tokio::join!(
            self.source.fetch_commits(&self.target),
            self.source.fetch_pull_requests(&self.target),
            self.source.fetch_events(&self.target),
        );

        let mut report = CycleReport::default();

        let commits = Self::page_or_empty(SourceKind::Commits, commits, &mut report);
        let pulls = Self::page_or_empty(SourceKind::PullRequests, pulls, &mut report);
        let events = Self::page_or_empty(SourceKind::Events, events, &mut report);

        let commit_records = map_commits(&commits);
        let pull_records = map_pull_requests(&pulls);
        let branch_records = map_branch_events(&events, &self.target.name);

        report.commits = commit_records.len();
        report.pull_requests = pull_records.len();
        report.branch_events = branch_records.len();

        let records: Vec<ActivityRecord> = commit_records
            .into_iter()
            .chain(pull_records)
            .chain(branch_records)
            .collect();

        self.store.ensure_schema().await?;
        for record in &records {
            self.store.append(record).await?;
            report.appended += 1;
        }

        debug!("Cycle report: {:?}", report);
        info!(
            "Stored {} of {} records ({} commits, {} pull requests, {} branch events)",
            report.appended,
            report.mapped(),
            report.commits,
            report.pull_requests,
            report.branch_events
        );
        Ok(report)
    }

    fn page_or_empty(
        kind: SourceKind,
        page: Result<Vec<Value>, SourceError>,
        report: &mut CycleReport,
    ) -> Vec<Value> {
        match page {
            Ok(items) => items,
            Err(e) => {
                warn!("Failed to fetch {}: {}", kind, e);
                report.failed_sources.push(kind);
                Vec::new()
            }
        }
    }
}
