use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::consumer::{Consumer, InboundRecord, StreamMessage};
use crate::errors::IngestError;
use crate::listener::{MessageHandler, Outcome};
use crate::orchestrator::PipelineStats;
use crate::retry::{Escalation, RetryEscalator, RetryHeaders, Stage};

/// One listener slot: a consumer bound to one stage of one entity kind.
///
/// A record is acknowledged only once it is settled: applied, skipped, or
/// handed to a retry topic or the dead-letter sink. A record whose
/// escalation fails is handled again after `redelivery_backoff`, so the
/// records behind it on the partition wait and no offset is committed past it.
pub struct Worker {
    name: String,
    stage: Stage,
    consumer: Arc<dyn Consumer>,
    handler: Arc<dyn MessageHandler>,
    escalator: Arc<RetryEscalator>,
    redelivery_backoff: Duration,
}

pub const DEFAULT_REDELIVERY_BACKOFF: Duration = Duration::from_secs(1);

enum Settlement {
    Settled,
    Unsettled(IngestError),
}

impl Worker {
    pub fn new(
        name: impl Into<String>,
        stage: Stage,
        consumer: Arc<dyn Consumer>,
        handler: Arc<dyn MessageHandler>,
        escalator: Arc<RetryEscalator>,
    ) -> Self {
        Self {
            name: name.into(),
            stage,
            consumer,
            handler,
            escalator,
            redelivery_backoff: DEFAULT_REDELIVERY_BACKOFF,
        }
    }

    pub fn with_redelivery_backoff(mut self, backoff: Duration) -> Self {
        self.redelivery_backoff = backoff;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub(crate) fn consumer(&self) -> &Arc<dyn Consumer> {
        &self.consumer
    }

    /// Processes records one at a time until the consumer ends or shutdown
    /// is signalled.
    pub(crate) async fn run(
        self,
        stats: Arc<PipelineStats>,
        mut shutdown: broadcast::Receiver<()>,
        channel_buffer_size: usize,
    ) {
        let (record_tx, mut record_rx) = mpsc::channel::<StreamMessage>(channel_buffer_size);
        let (ack_tx, ack_rx) = mpsc::channel::<StreamMessage>(channel_buffer_size);

        let consumer = Arc::clone(&self.consumer);
        let consumer_shutdown = shutdown.resubscribe();
        let worker_name = self.name.clone();
        let consumer_handle = tokio::spawn(async move {
            if let Err(e) = consumer.run(record_tx, ack_rx, consumer_shutdown).await {
                error!(worker = %worker_name, error = %e, "Consumer error");
            }
        });

        info!(worker = %self.name, stage = %self.stage, kind = %self.handler.kind(), "Worker started");

        loop {
            let message = tokio::select! {
                _ = shutdown.recv() => {
                    info!(worker = %self.name, "Worker received shutdown signal");
                    break;
                }
                message = record_rx.recv() => message,
            };

            match message {
                Some(StreamMessage::Record(record)) => {
                    stats.record_received();
                    if !self.settle(&record, &stats, &mut shutdown).await {
                        info!(
                            worker = %self.name,
                            offset = record.offset,
                            "Shutdown before the record was settled, leaving it uncommitted"
                        );
                        break;
                    }

                    let _ = ack_tx
                        .send(StreamMessage::Acknowledgment {
                            offset: record.position(),
                            success: true,
                            error: None,
                        })
                        .await;
                }
                Some(StreamMessage::Error(e)) => {
                    error!(worker = %self.name, error = %e, "Received error from consumer");
                }
                Some(StreamMessage::End) | None => {
                    info!(worker = %self.name, "Consumer stream ended");
                    break;
                }
                Some(StreamMessage::Acknowledgment { .. }) => {
                    warn!(worker = %self.name, "Received acknowledgment on record channel");
                }
            }
        }

        drop(record_rx);
        drop(ack_tx);
        let _ = consumer_handle.await;
        info!(worker = %self.name, "Worker stopped");
    }

    /// Handles `record` until it is settled. `false` when shutdown came first.
    async fn settle(
        &self,
        record: &InboundRecord,
        stats: &PipelineStats,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> bool {
        let mut redeliveries = 0u32;
        loop {
            match self.process(record, stats, shutdown).await {
                None => return false,
                Some(Settlement::Settled) => return true,
                Some(Settlement::Unsettled(e)) => {
                    redeliveries += 1;
                    error!(
                        worker = %self.name,
                        topic = %record.topic,
                        partition = record.partition,
                        offset = record.offset,
                        redeliveries = redeliveries,
                        backoff_ms = self.redelivery_backoff.as_millis() as u64,
                        error = %e,
                        "Failed to escalate record, handling it again"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(self.redelivery_backoff) => {}
                        _ = shutdown.recv() => return false,
                    }
                }
            }
        }
    }

    /// `None` when shutdown interrupted the wait for a retry's due time.
    async fn process(
        &self,
        record: &InboundRecord,
        stats: &PipelineStats,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Option<Settlement> {
        if let Stage::Retry(_) = self.stage {
            if let Some(due_at_ms) = RetryHeaders::due_at_of(record) {
                let wait_ms = due_at_ms - Utc::now().timestamp_millis();
                if wait_ms > 0 {
                    debug!(wait_ms = wait_ms, offset = record.offset, "Waiting for retry due time");
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_millis(wait_ms as u64)) => {}
                        _ = shutdown.recv() => return None,
                    }
                }
            }
        }

        match self.handler.handle(record.payload.as_deref()).await {
            Ok(Outcome::Upserted { .. }) | Ok(Outcome::Deleted { .. }) => {
                stats.record_applied();
                Some(Settlement::Settled)
            }
            Ok(Outcome::Skipped { .. }) | Ok(Outcome::Ignored) => {
                stats.record_skipped();
                Some(Settlement::Settled)
            }
            Err(err) => {
                warn!(
                    worker = %self.name,
                    topic = %record.topic,
                    partition = record.partition,
                    offset = record.offset,
                    stage = %self.stage,
                    error_class = %err.class(),
                    error = %err,
                    "Handler failed"
                );

                match self.escalator.escalate(record, self.stage, &err).await {
                    Ok(Escalation::Retried { .. }) => {
                        stats.record_escalated();
                        Some(Settlement::Settled)
                    }
                    Ok(Escalation::DeadLettered) => {
                        stats.record_dead_lettered();
                        Some(Settlement::Settled)
                    }
                    Err(e) => {
                        stats.record_failed();
                        Some(Settlement::Unsettled(e))
                    }
                }
            }
        }
    }
}
