//! Orchestrator module for the catalog indexer.
//!
//! Runs every [`Worker`] (one per entity kind, stage and concurrency slot)
//! and reports progress until they all stop.

mod stats;
mod worker;

pub use stats::{PipelineStats, StatsSnapshot};
pub use worker::Worker;

use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info, instrument};

use crate::errors::IngestError;

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Size of each worker's record and acknowledgment channels.
    pub channel_buffer_size: usize,
    pub progress_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: 100,
            progress_interval: Duration::from_secs(10),
        }
    }
}

pub struct Orchestrator {
    workers: Vec<Worker>,
    config: OrchestratorConfig,
    shutdown_tx: broadcast::Sender<()>,
    stats: Arc<PipelineStats>,
}

impl Orchestrator {
    pub fn new(workers: Vec<Worker>) -> Self {
        Self::with_config(workers, OrchestratorConfig::default())
    }

    pub fn with_config(workers: Vec<Worker>, config: OrchestratorConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            workers,
            config,
            shutdown_tx,
            stats: Arc::new(PipelineStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<PipelineStats> {
        Arc::clone(&self.stats)
    }

    /// Handle for triggering shutdown from another task.
    pub fn shutdown_sender(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Trigger a graceful shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Subscribes every consumer, then runs all workers until each of them
    /// has stopped.
    #[instrument(skip(self))]
    pub async fn run(&mut self) -> Result<(), IngestError> {
        info!(workers = self.workers.len(), "Starting catalog indexer orchestrator");

        for worker in &self.workers {
            worker.consumer().subscribe()?;
        }

        let mut tasks = JoinSet::new();
        for worker in std::mem::take(&mut self.workers) {
            let stats = Arc::clone(&self.stats);
            let shutdown = self.shutdown_tx.subscribe();
            let buffer = self.config.channel_buffer_size;
            tasks.spawn(worker.run(stats, shutdown, buffer));
        }

        let mut progress_timer = interval(self.config.progress_interval);
        progress_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        progress_timer.tick().await;

        let mut previous = self.stats.snapshot();
        let mut previous_time = std::time::Instant::now();

        loop {
            tokio::select! {
                joined = tasks.join_next() => {
                    match joined {
                        Some(Ok(())) => {}
                        Some(Err(e)) => error!(error = %e, "Worker task failed"),
                        None => break,
                    }
                }
                _ = progress_timer.tick() => {
                    let current = self.stats.snapshot();
                    let now = std::time::Instant::now();
                    let elapsed_secs = now.duration_since(previous_time).as_secs_f64();
                    let applied_per_sec = if elapsed_secs > 0.0 {
                        current.applied.saturating_sub(previous.applied) as f64 / elapsed_secs
                    } else {
                        0.0
                    };

                    info!(
                        received = current.received,
                        applied = current.applied,
                        skipped = current.skipped,
                        escalated = current.escalated,
                        dead_lettered = current.dead_lettered,
                        failed = current.failed,
                        applied_per_sec = format!("{:.2}", applied_per_sec),
                        "Processing progress"
                    );

                    previous = current;
                    previous_time = now;
                }
            }
        }

        let totals = self.stats.snapshot();
        info!(
            received = totals.received,
            applied = totals.applied,
            skipped = totals.skipped,
            escalated = totals.escalated,
            dead_lettered = totals.dead_lettered,
            "Orchestrator shutdown complete"
        );
        Ok(())
    }
}
