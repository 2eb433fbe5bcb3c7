use crate::error::ConfigError;
use crate::models::RepoTarget;
use chrono::FixedOffset;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.github.com";
pub const DEFAULT_DATABASE_URL: &str = "sqlite:./data/vcs_activity.db";
pub const DEFAULT_RECALL_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_OWNER: &str = "microsoft";
const DEFAULT_REPO: &str = "vscode";
const DEFAULT_INTERVAL_SECS: u64 = 2222;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Process configuration, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub github_base_url: String,
    pub github_token: Option<String>,
    pub target: RepoTarget,
    pub collect_interval: Duration,
    pub http_timeout: Duration,
    pub database_url: String,
    pub recall_addr: String,
    pub chart_offset: FixedOffset,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let collect_interval = parse_secs(
            "COLLECT_INTERVAL_SECS",
            lookup("COLLECT_INTERVAL_SECS"),
            DEFAULT_INTERVAL_SECS,
        )?;
        let http_timeout = parse_secs(
            "HTTP_TIMEOUT_SECS",
            lookup("HTTP_TIMEOUT_SECS"),
            DEFAULT_TIMEOUT_SECS,
        )?;

        let offset_raw = get("CHART_UTC_OFFSET", "+00:00");
        let chart_offset =
            FixedOffset::from_str(&offset_raw).map_err(|e| ConfigError::Invalid {
                var: "CHART_UTC_OFFSET",
                value: offset_raw.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            github_base_url: get("GITHUB_API_BASE_URL", DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            github_token: lookup("GITHUB_API_TOKEN").filter(|t| !t.trim().is_empty()),
            target: RepoTarget::new(
                get("GITHUB_OWNER", DEFAULT_OWNER),
                get("GITHUB_REPO", DEFAULT_REPO),
            ),
            collect_interval,
            http_timeout,
            database_url: get("DATABASE_URL", DEFAULT_DATABASE_URL),
            recall_addr: get("RECALL_ADDR", DEFAULT_RECALL_ADDR),
            chart_offset,
        })
    }
}

fn parse_secs(
    var: &'static str,
    raw: Option<String>,
    default: u64,
) -> Result<Duration, ConfigError> {
    let Some(raw) = raw.filter(|v| !v.trim().is_empty()) else {
        return Ok(Duration::from_secs(default));
    };
    let secs = raw.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
        var,
        value: raw.clone(),
        reason: e.to_string(),
    })?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            var,
            value: raw,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}
