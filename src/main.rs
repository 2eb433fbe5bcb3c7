use std::future::Future;
use std::io;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};
use vcs_activity_common::{db, logging, ActivityStore, Config, GitHubClient, TimeRange};
use vcs_activity_learner::{Collector, Scheduler};
use vcs_activity_recall::query_engine::epoch_sentinel;
use vcs_activity_recall::{server, QueryEngine};

#[derive(Parser)]
#[command(author, version, about = "VCS activity collector and chart backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduled collector and the recall server until Ctrl-C
    Start,

    /// Run a single collection cycle and print its report
    Collect,

    /// Print chart data as JSON
    Chart,

    /// Print stored activity records as JSON
    Events {
        /// Earliest timestamp to include (RFC 3339)
        #[arg(long)]
        from: Option<DateTime<Utc>>,

        /// Latest timestamp to include (RFC 3339)
        #[arg(long)]
        to: Option<DateTime<Utc>>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let cli = Cli::parse();
    let config = Config::from_env().context("invalid configuration")?;
    let store = db::connect(&config.database_url)
        .await
        .with_context(|| format!("failed to open store at {}", config.database_url))?;

    match cli.command.unwrap_or(Commands::Start) {
        Commands::Start => start(&config, store).await?,
        Commands::Collect => {
            let collector = collector(&config, store)?;
            let report = collector.collect_once().await.context("collection cycle failed")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Chart => {
            let engine = QueryEngine::new(store, config.chart_offset);
            let chart = engine.chart_data().await.context("failed to build chart data")?;
            println!("{}", serde_json::to_string_pretty(&chart)?);
        }
        Commands::Events { from, to } => {
            let from = from.unwrap_or_else(epoch_sentinel);
            let to = to.unwrap_or_else(Utc::now);
            let Some(range) = TimeRange::new(from, to) else {
                bail!("--from ({from}) is after --to ({to})");
            };

            let engine = QueryEngine::new(store, config.chart_offset);
            let events = engine.get_events_in(range).await.context("failed to query events")?;
            println!("{}", serde_json::to_string_pretty(&events)?);
        }
    }

    Ok(())
}

fn collector(config: &Config, store: Arc<dyn ActivityStore>) -> Result<Collector> {
    let client = GitHubClient::from_config(config).context("failed to build GitHub client")?;
    Ok(Collector::new(Arc::new(client), store, config.target.clone()))
}

async fn start(config: &Config, store: Arc<dyn ActivityStore>) -> Result<()> {
    start_until(config, store, tokio::signal::ctrl_c()).await
}

/// Runs the scheduler and the recall server until `shutdown` resolves or the
/// server stops, then stops the scheduler.
async fn start_until<F>(config: &Config, store: Arc<dyn ActivityStore>, shutdown: F) -> Result<()>
where
    F: Future<Output = io::Result<()>>,
{
    info!("Starting VCS activity pipeline for {}", config.target);

    // Nothing is spawned until the listener is bound.
    let listener = TcpListener::bind(&config.recall_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.recall_addr))?;
    let collector = Arc::new(collector(config, store.clone())?);

    let engine = QueryEngine::new(store, config.chart_offset);
    let mut recall = tokio::spawn(server::serve(listener, engine));
    let scheduler = Scheduler::spawn(collector, config.collect_interval);

    let outcome = supervise(&mut recall, shutdown).await;

    recall.abort();
    if let Err(e) = scheduler.stop().await {
        error!("Collector task ended abnormally: {}", e);
    }

    outcome
}

/// Waits for shutdown, reporting the recall server as an error if it ends first.
async fn supervise<F>(recall: &mut JoinHandle<io::Result<()>>, shutdown: F) -> Result<()>
where
    F: Future<Output = io::Result<()>>,
{
    tokio::select! {
        signal = shutdown => {
            signal.context("failed to listen for Ctrl-C")?;
            info!("Shutting down");
            Ok(())
        }
        served = recall => {
            let err = match served {
                Ok(Ok(())) => anyhow!("recall server exited"),
                Ok(Err(e)) => anyhow::Error::new(e).context("recall server failed"),
                Err(e) => anyhow::Error::new(e).context("recall server task ended abnormally"),
            };
            error!("{:#}", err);
            Err(err)
        }
    }
}
