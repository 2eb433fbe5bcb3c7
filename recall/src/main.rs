use anyhow::{Context, Result};
use tokio::net::TcpListener;
use vcs_activity_common::{db, logging, Config};
use vcs_activity_recall::{server, QueryEngine};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let config = Config::from_env().context("invalid configuration")?;

    let store = db::connect(&config.database_url)
        .await
        .with_context(|| format!("failed to open store at {}", config.database_url))?;
    let engine = QueryEngine::new(store, config.chart_offset);

    let listener = TcpListener::bind(&config.recall_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.recall_addr))?;

    tokio::select! {
        res = server::serve(listener, engine) => res.context("recall server failed")?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down"),
    }

    Ok(())
}
