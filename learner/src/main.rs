use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use vcs_activity_common::{db, logging, Config, GitHubClient};
use vcs_activity_learner::{Collector, Scheduler};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let config = Config::from_env().context("invalid configuration")?;

    let store = db::connect(&config.database_url)
        .await
        .with_context(|| format!("failed to open store at {}", config.database_url))?;
    let client = GitHubClient::from_config(&config).context("failed to build GitHub client")?;

    let collector = Arc::new(Collector::new(Arc::new(client), store, config.target.clone()));
    let handle = Scheduler::spawn(collector, config.collect_interval);

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("Shutting down");
    handle.stop().await.context("collector task panicked")?;

    Ok(())
}
