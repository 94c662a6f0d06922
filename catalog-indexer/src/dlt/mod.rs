//! Dead-letter sink: terminal record of changes that could not be applied.
//!
//! Recording never fails from the caller's point of view. A record
//! published to `{topic}-dlt` can be replayed by re-publishing its payload
//! to [`DeadLetterRecord::replay_target`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::consumer::RecordOffset;
use crate::listener::FailureClass;
use crate::producer::{OutboundRecord, Publisher};
use crate::retry::{
    dead_letter_topic, Stage, ATTEMPT, EXCEPTION_CLASS, EXCEPTION_MESSAGE, ORIGINAL_OFFSET,
    ORIGINAL_PARTITION, ORIGINAL_TOPIC,
};

pub const FAILED_STAGE: &str = "catalog-failed-stage";
pub const DEAD_LETTERED_AT: &str = "catalog-dead-lettered-at";

#[derive(Debug, Clone, PartialEq)]
pub struct DeadLetterRecord {
    pub key: Option<Vec<u8>>,
    pub payload: Option<Vec<u8>>,
    pub origin: RecordOffset,
    pub stage: Stage,
    /// Handler passes made, including the one that failed last.
    pub attempts: usize,
    pub error_class: FailureClass,
    pub error_message: String,
    pub dead_lettered_at: DateTime<Utc>,
}

impl DeadLetterRecord {
    /// Topic the payload should be re-published to for a replay.
    pub fn replay_target(&self) -> &str {
        &self.origin.topic
    }

    pub fn topic(&self) -> String {
        dead_letter_topic(&self.origin.topic)
    }

    pub fn headers(&self) -> Vec<(String, String)> {
        vec![
            (ORIGINAL_TOPIC.to_string(), self.origin.topic.clone()),
            (ORIGINAL_PARTITION.to_string(), self.origin.partition.to_string()),
            (ORIGINAL_OFFSET.to_string(), self.origin.offset.to_string()),
            (ATTEMPT.to_string(), self.attempts.to_string()),
            (EXCEPTION_MESSAGE.to_string(), self.error_message.clone()),
            (EXCEPTION_CLASS.to_string(), self.error_class.to_string()),
            (FAILED_STAGE.to_string(), self.stage.to_string()),
            (DEAD_LETTERED_AT.to_string(), self.dead_lettered_at.to_rfc3339()),
        ]
    }

    fn log(&self) {
        let payload = self
            .payload
            .as_deref()
            .map(String::from_utf8_lossy)
            .unwrap_or_default();
        warn!(
            original_topic = %self.origin.topic,
            original_partition = self.origin.partition,
            original_offset = self.origin.offset,
            stage = %self.stage,
            attempts = self.attempts,
            error_class = %self.error_class,
            error = %self.error_message,
            payload = %payload,
            "Message dead-lettered"
        );
    }
}

#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    async fn record(&self, record: &DeadLetterRecord);
}

/// Logs the dead-lettered record and nothing else.
#[derive(Debug, Default)]
pub struct LoggingDeadLetterSink;

#[async_trait]
impl DeadLetterSink for LoggingDeadLetterSink {
    async fn record(&self, record: &DeadLetterRecord) {
        record.log();
    }
}

/// Logs, then publishes the raw record with its metadata to `{topic}-dlt`.
pub struct KafkaDeadLetterSink {
    publisher: Arc<dyn Publisher>,
}

impl KafkaDeadLetterSink {
    pub fn new(publisher: Arc<dyn Publisher>) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl DeadLetterSink for KafkaDeadLetterSink {
    async fn record(&self, record: &DeadLetterRecord) {
        record.log();

        let outbound = OutboundRecord {
            topic: record.topic(),
            key: record.key.clone(),
            payload: record.payload.clone(),
            headers: record.headers(),
        };
        let topic = outbound.topic.clone();

        match self.publisher.publish(outbound).await {
            Ok(()) => info!(topic = %topic, "Dead-letter record published"),
            Err(e) => error!(
                topic = %topic,
                original_offset = record.origin.offset,
                error = %e,
                "Failed to publish dead-letter record"
            ),
        }
    }
}
