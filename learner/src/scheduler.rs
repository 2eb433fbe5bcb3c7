use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::collector::Collector;

/// Runs collection cycles on a fixed period.
///
/// The first cycle starts immediately. A cycle is awaited inside the tick
/// loop, so cycles never overlap. Ticks that come due while one is running
/// are dropped: after an overrunning cycle the next one starts a full period
/// after it finished.
pub struct Scheduler;

/// Handle to a running scheduler task.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Scheduler {
    pub fn spawn(collector: Arc<Collector>, period: Duration) -> SchedulerHandle {
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            info!(
                "Starting collector for {} every {:?}",
                collector.target(),
                period
            );

            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {}
                }

                let started = Instant::now();
                if let Err(e) = collector.collect_once().await {
                    error!("Collection cycle failed: {}", e);
                }

                let elapsed = started.elapsed();
                if elapsed > period {
                    warn!(
                        "Collection cycle took {:?}, longer than the {:?} period; next cycle in {:?}",
                        elapsed, period, period
                    );
                    ticker.reset();
                }
            }

            info!("Collector stopped");
        });

        SchedulerHandle { shutdown, task }
    }
}

impl SchedulerHandle {
    /// Signals shutdown and waits for the task. A cycle already in progress
    /// runs to completion first.
    pub async fn stop(self) -> Result<(), JoinError> {
        // Fails only if the task already exited.
        let _ = self.shutdown.send(true);
        self.task.await
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
