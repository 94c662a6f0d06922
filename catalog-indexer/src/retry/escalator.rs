use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

use crate::consumer::InboundRecord;
use crate::dlt::{DeadLetterRecord, DeadLetterSink};
use crate::errors::IngestError;
use crate::listener::{FailureClass, HandlerError};
use crate::producer::{OutboundRecord, Publisher};
use crate::retry::{retry_topic, RetryHeaders, RetryTopology, Stage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Escalation {
    Retried {
        topic: String,
        stage: usize,
        delay: Duration,
    },
    DeadLettered,
}

/// Routes a record whose handler failed to its next retry topic, or to the
/// dead-letter sink when it failed permanently or ran out of attempts.
pub struct RetryEscalator {
    topology: RetryTopology,
    publisher: Arc<dyn Publisher>,
    dead_letters: Arc<dyn DeadLetterSink>,
}

impl RetryEscalator {
    pub fn new(
        topology: RetryTopology,
        publisher: Arc<dyn Publisher>,
        dead_letters: Arc<dyn DeadLetterSink>,
    ) -> Self {
        Self {
            topology,
            publisher,
            dead_letters,
        }
    }

    pub fn topology(&self) -> &RetryTopology {
        &self.topology
    }

    /// An `Err` means the record could not be handed to its retry topic and
    /// must not be acknowledged.
    #[instrument(skip(self, record, error), fields(topic = %record.topic, offset = record.offset, stage = %stage))]
    pub async fn escalate(
        &self,
        record: &InboundRecord,
        stage: Stage,
        error: &HandlerError,
    ) -> Result<Escalation, IngestError> {
        let origin = RetryHeaders::origin_of(record);
        let class = error.class();

        let next = match class {
            FailureClass::Permanent => None,
            FailureClass::Transient | FailureClass::BackPressure => {
                self.topology.next_retry(stage)
            }
        };

        let Some(index) = next else {
            self.dead_letters
                .record(&DeadLetterRecord {
                    key: record.key.clone(),
                    payload: record.payload.clone(),
                    origin,
                    stage,
                    attempts: stage.attempt(),
                    error_class: class,
                    error_message: error.to_string(),
                    dead_lettered_at: Utc::now(),
                })
                .await;
            return Ok(Escalation::DeadLettered);
        };

        let delay = self.topology.delay(index);
        let due_at_ms = Utc::now().timestamp_millis()
            + i64::try_from(delay.as_millis()).unwrap_or(i64::MAX / 2);
        let topic = retry_topic(&origin.topic, index);

        let headers = RetryHeaders {
            origin,
            attempt: stage.attempt() + 1,
            due_at_ms,
            exception_message: error.to_string(),
            exception_class: class,
        }
        .apply_to(record);

        self.publisher
            .publish(OutboundRecord {
                topic: topic.clone(),
                key: record.key.clone(),
                payload: record.payload.clone(),
                headers,
            })
            .await?;

        info!(
            retry_topic = %topic,
            delay_ms = delay.as_millis() as u64,
            error_class = %class,
            "Record escalated to retry topic"
        );

        Ok(Escalation::Retried {
            topic,
            stage: index,
            delay,
        })
    }
}
