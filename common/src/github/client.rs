//! GitHub REST client
//!
//! Reads one page of commits, pull requests and repository events for a
//! repository. Items are returned undecoded; see `adapters` for mapping.

use crate::config::Config;
use crate::error::SourceError;
use crate::models::{RepoTarget, SourceKind};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = "vcs-activity";
const PAGE_SIZE: &str = "100";

/// Upstream source of raw activity pages for one repository.
#[async_trait]
pub trait ActivitySource: Send + Sync {
    async fn fetch_commits(&self, target: &RepoTarget) -> Result<Vec<Value>, SourceError>;
    async fn fetch_pull_requests(&self, target: &RepoTarget) -> Result<Vec<Value>, SourceError>;
    async fn fetch_events(&self, target: &RepoTarget) -> Result<Vec<Value>, SourceError>;
}

#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    base_url: String,
}

impl GitHubClient {
    /// Every request made by this client gives up after `timeout`.
    pub fn new(
        base_url: impl Into<String>,
        token: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));

        if let Some(t) = token {
            let mut auth_val = HeaderValue::from_str(&format!("Bearer {t}"))
                .map_err(|e| SourceError::Client(format!("invalid token: {e}")))?;
            auth_val.set_sensitive(true);
            headers.insert(AUTHORIZATION, auth_val);
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        Self::new(
            config.github_base_url.clone(),
            config.github_token.as_deref(),
            config.http_timeout,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn repo_url(&self, target: &RepoTarget, resource: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.base_url, target.owner, target.name, resource
        )
    }

    async fn get_page(
        &self,
        kind: SourceKind,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<Value>, SourceError> {
        debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|source| SourceError::Http { kind, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                kind,
                status,
                url: url.to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| SourceError::Http { kind, source })?;

        match serde_json::from_slice::<Value>(&body) {
            Ok(Value::Array(items)) => Ok(items),
            Ok(other) => Err(SourceError::Envelope {
                kind,
                reason: format!("expected a JSON array, got {}", json_type(&other)),
            }),
            Err(e) => Err(SourceError::Envelope {
                kind,
                reason: e.to_string(),
            }),
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[async_trait]
impl ActivitySource for GitHubClient {
    async fn fetch_commits(&self, target: &RepoTarget) -> Result<Vec<Value>, SourceError> {
        let url = self.repo_url(target, "commits");
        self.get_page(SourceKind::Commits, &url, &[("per_page", PAGE_SIZE)])
            .await
    }

    async fn fetch_pull_requests(&self, target: &RepoTarget) -> Result<Vec<Value>, SourceError> {
        let url = self.repo_url(target, "pulls");
        self.get_page(
            SourceKind::PullRequests,
            &url,
            &[("state", "all"), ("per_page", PAGE_SIZE)],
        )
        .await
    }

    async fn fetch_events(&self, target: &RepoTarget) -> Result<Vec<Value>, SourceError> {
        let url = self.repo_url(target, "events");
        self.get_page(SourceKind::Events, &url, &[("per_page", PAGE_SIZE)])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_urls_are_built_from_target() {
        let client =
            GitHubClient::new("https://api.github.com/", None, Duration::from_secs(5)).unwrap();
        let target = RepoTarget::new("microsoft", "vscode");
        assert_eq!(client.base_url(), "https://api.github.com");
        assert_eq!(
            client.repo_url(&target, "pulls"),
            "https://api.github.com/repos/microsoft/vscode/pulls"
        );
    }

    #[test]
    fn token_with_newline_is_rejected() {
        let err = GitHubClient::new("http://x", Some("bad\ntoken"), Duration::from_secs(5))
            .unwrap_err();
        assert!(matches!(err, SourceError::Client(_)));
    }
}
