//! Mapping of upstream items to [`ActivityRecord`]s.
//!
//! Each upstream shape gets a typed decode that fails closed: an item missing
//! a field, or carrying an unparsable timestamp, is skipped and the rest of
//! the page is still converted.

use crate::error::MappingError;
use crate::models::{event_type, ActivityRecord, DEFAULT_BRANCH, STATUS_SUCCESS};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct CommitItem {
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    author: CommitAuthor,
    url: String,
}

#[derive(Debug, Deserialize)]
struct CommitAuthor {
    name: String,
    date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct PullRequestItem {
    user: PullRequestUser,
    base: BaseRef,
    state: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct PullRequestUser {
    login: String,
    repos_url: String,
}

#[derive(Debug, Deserialize)]
struct BaseRef {
    #[serde(rename = "ref")]
    ref_name: String,
}

/// Just enough of a feed event to decide whether it is a branch event.
#[derive(Debug, Deserialize)]
struct EventHeader {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    payload: Option<RefTypeOnly>,
}

#[derive(Debug, Deserialize)]
struct RefTypeOnly {
    ref_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BranchEventItem {
    actor: Actor,
    payload: BranchPayload,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct Actor {
    login: String,
}

#[derive(Debug, Deserialize)]
struct BranchPayload {
    #[serde(rename = "ref")]
    ref_name: String,
}

pub fn commit_record(item: &Value) -> Result<ActivityRecord, MappingError> {
    let CommitItem { commit } = CommitItem::deserialize(item)?;
    Ok(ActivityRecord::new(
        commit.author.date,
        event_type::COMMIT,
        commit.author.name,
        commit.url,
        DEFAULT_BRANCH,
        STATUS_SUCCESS,
    ))
}

pub fn pull_request_record(item: &Value) -> Result<ActivityRecord, MappingError> {
    let pr = PullRequestItem::deserialize(item)?;
    Ok(ActivityRecord::new(
        pr.created_at,
        event_type::PULL_REQUEST,
        pr.user.login,
        pr.user.repos_url,
        pr.base.ref_name,
        pr.state,
    ))
}

/// `Ok(None)` for anything in the feed that is not a branch creation or deletion.
pub fn branch_record(item: &Value, repository: &str) -> Result<Option<ActivityRecord>, MappingError> {
    let header = EventHeader::deserialize(item)?;
    let event_type = match header.kind.as_deref() {
        Some("CreateEvent") => event_type::BRANCH_CREATION,
        Some("DeleteEvent") => event_type::BRANCH_DELETION,
        _ => return Ok(None),
    };
    let is_branch = header
        .payload
        .and_then(|p| p.ref_type)
        .is_some_and(|ref_type| ref_type == "branch");
    if !is_branch {
        return Ok(None);
    }

    let event = BranchEventItem::deserialize(item)?;
    Ok(Some(ActivityRecord::new(
        event.created_at,
        event_type,
        event.actor.login,
        repository,
        event.payload.ref_name,
        STATUS_SUCCESS,
    )))
}

pub fn map_commits(page: &[Value]) -> Vec<ActivityRecord> {
    page.iter()
        .enumerate()
        .filter_map(|(index, item)| skip_on_error("commit", index, commit_record(item)))
        .collect()
}

pub fn map_pull_requests(page: &[Value]) -> Vec<ActivityRecord> {
    page.iter()
        .enumerate()
        .filter_map(|(index, item)| skip_on_error("pull request", index, pull_request_record(item)))
        .collect()
}

pub fn map_branch_events(page: &[Value], repository: &str) -> Vec<ActivityRecord> {
    page.iter()
        .enumerate()
        .filter_map(|(index, item)| {
            skip_on_error("event", index, branch_record(item, repository)).flatten()
        })
        .collect()
}

fn skip_on_error<T>(what: &str, index: usize, result: Result<T, MappingError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Skipping {} #{}: {}", what, index, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn commit_json(name: &str, date: &str) -> Value {
        json!({
            "sha": "6dcb09b5b57875f334f61aebed695e2e4193db5e",
            "url": "https://api.github.com/repos/o/r/commits/6dcb09b",
            "commit": {
                "url": "https://api.github.com/repos/o/r/git/commits/6dcb09b",
                "author": { "name": name, "email": "a@example.com", "date": date },
                "message": "Fix all the bugs"
            }
        })
    }

    fn pull_json(login: &str, state: &str, base: &str, created_at: &str) -> Value {
        json!({
            "number": 1347,
            "state": state,
            "user": {
                "login": login,
                "repos_url": format!("https://api.github.com/users/{login}/repos")
            },
            "base": { "ref": base, "sha": "abc" },
            "created_at": created_at
        })
    }

    fn feed_event(kind: &str, ref_type: &str, ref_name: &str) -> Value {
        json!({
            "id": "22249084947",
            "type": kind,
            "actor": { "id": 583231, "login": "octocat" },
            "repo": { "name": "octocat/Hello-World" },
            "payload": { "ref": ref_name, "ref_type": ref_type },
            "created_at": "2024-02-10T08:15:00Z"
        })
    }

    #[test]
    fn commit_item_becomes_commit_record() {
        let record = commit_record(&commit_json("Monalisa", "2024-01-01T10:20:30Z")).unwrap();
        assert_eq!(record.event_type(), "Commit");
        assert_eq!(record.branch(), "main");
        assert_eq!(record.status(), "Success");
        assert_eq!(record.developer_id(), "Monalisa");
        assert_eq!(
            record.repository_id(),
            "https://api.github.com/repos/o/r/git/commits/6dcb09b"
        );
        assert_eq!(
            record.timestamp(),
            Utc.with_ymd_and_hms(2024, 1, 1, 10, 20, 30).unwrap()
        );
    }

    #[test]
    fn commit_missing_author_date_is_skipped_rest_converted() {
        let mut broken = commit_json("Ghost", "2024-01-01T00:00:00Z");
        broken["commit"]["author"]
            .as_object_mut()
            .unwrap()
            .remove("date");
        let page = vec![
            commit_json("Ada", "2024-01-01T09:00:00Z"),
            broken,
            commit_json("Grace", "2024-01-02T09:00:00Z"),
        ];

        let records = map_commits(&page);
        let authors: Vec<_> = records.iter().map(ActivityRecord::developer_id).collect();
        assert_eq!(authors, vec!["Ada", "Grace"]);
    }

    #[test]
    fn commit_with_unparsable_date_is_skipped() {
        let page = vec![commit_json("Ada", "yesterday-ish")];
        assert!(map_commits(&page).is_empty());
    }

    #[test]
    fn pull_request_item_becomes_pull_request_record() {
        let record =
            pull_request_record(&pull_json("octocat", "closed", "develop", "2024-01-05T12:00:00Z"))
                .unwrap();
        assert_eq!(record.event_type(), "Pull Request");
        assert_eq!(record.developer_id(), "octocat");
        assert_eq!(record.branch(), "develop");
        assert_eq!(record.status(), "closed");
        assert_eq!(
            record.repository_id(),
            "https://api.github.com/users/octocat/repos"
        );
        assert_eq!(
            record.timestamp(),
            Utc.with_ymd_and_hms(2024, 1, 5, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn pull_request_without_base_is_skipped() {
        let mut broken = pull_json("octocat", "open", "main", "2024-01-05T12:00:00Z");
        broken.as_object_mut().unwrap().remove("base");
        let page = vec![broken, pull_json("hubot", "open", "main", "2024-01-06T12:00:00Z")];

        let records = map_pull_requests(&page);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].developer_id(), "hubot");
    }

    #[test]
    fn create_branch_event_becomes_branch_creation() {
        let record = branch_record(&feed_event("CreateEvent", "branch", "feature/x"), "Hello-World")
            .unwrap()
            .unwrap();
        assert_eq!(record.event_type(), "Branch Creation");
        assert_eq!(record.branch(), "feature/x");
        assert_eq!(record.repository_id(), "Hello-World");
        assert_eq!(record.developer_id(), "octocat");
        assert_eq!(record.status(), "Success");
    }

    #[test]
    fn delete_branch_event_becomes_branch_deletion() {
        let record = branch_record(&feed_event("DeleteEvent", "branch", "old"), "Hello-World")
            .unwrap()
            .unwrap();
        assert_eq!(record.event_type(), "Branch Deletion");
    }

    #[test]
    fn non_branch_feed_items_are_dropped() {
        let page = vec![
            feed_event("CreateEvent", "tag", "v1.0.0"),
            feed_event("DeleteEvent", "tag", "v0.9.0"),
            feed_event("PushEvent", "branch", "main"),
            json!({ "type": "WatchEvent", "payload": { "action": "started" } }),
            json!({ "type": "IssuesEvent" }),
        ];
        assert!(map_branch_events(&page, "Hello-World").is_empty());
    }

    #[test]
    fn broken_branch_event_is_skipped_rest_converted() {
        let mut broken = feed_event("CreateEvent", "branch", "a");
        broken.as_object_mut().unwrap().remove("actor");
        let page = vec![broken, feed_event("CreateEvent", "branch", "b")];

        let records = map_branch_events(&page, "Hello-World");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].branch(), "b");
    }

    #[test]
    fn non_object_items_never_panic() {
        let page = vec![json!(null), json!(42), json!("text"), json!([])];
        assert!(map_commits(&page).is_empty());
        assert!(map_pull_requests(&page).is_empty());
        assert!(map_branch_events(&page, "r").is_empty());
    }
}
