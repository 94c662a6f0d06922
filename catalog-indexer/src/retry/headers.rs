//! Headers carried by a record while it moves through the retry topics.

use crate::consumer::{InboundRecord, RecordOffset};
use crate::listener::FailureClass;

pub const ORIGINAL_TOPIC: &str = "catalog-original-topic";
pub const ORIGINAL_PARTITION: &str = "catalog-original-partition";
pub const ORIGINAL_OFFSET: &str = "catalog-original-offset";
pub const ATTEMPT: &str = "catalog-attempt";
pub const DUE_AT_MS: &str = "catalog-due-at-ms";
pub const EXCEPTION_MESSAGE: &str = "catalog-exception-message";
pub const EXCEPTION_CLASS: &str = "catalog-exception-class";

const ALL: [&str; 7] = [
    ORIGINAL_TOPIC,
    ORIGINAL_PARTITION,
    ORIGINAL_OFFSET,
    ATTEMPT,
    DUE_AT_MS,
    EXCEPTION_MESSAGE,
    EXCEPTION_CLASS,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryHeaders {
    pub origin: RecordOffset,
    /// Attempt about to run, 1-based.
    pub attempt: usize,
    pub due_at_ms: i64,
    pub exception_message: String,
    pub exception_class: FailureClass,
}

impl RetryHeaders {
    /// Where `record` was first published: its own position on the source
    /// topic, or the position recorded in its retry headers.
    pub fn origin_of(record: &InboundRecord) -> RecordOffset {
        let topic = record.header(ORIGINAL_TOPIC);
        let partition = record
            .header(ORIGINAL_PARTITION)
            .and_then(|v| v.parse::<i32>().ok());
        let offset = record
            .header(ORIGINAL_OFFSET)
            .and_then(|v| v.parse::<i64>().ok());

        match (topic, partition, offset) {
            (Some(topic), Some(partition), Some(offset)) => RecordOffset {
                topic: topic.to_string(),
                partition,
                offset,
            },
            _ => record.position(),
        }
    }

    /// Due time of a retried record, in epoch milliseconds.
    pub fn due_at_of(record: &InboundRecord) -> Option<i64> {
        record.header(DUE_AT_MS).and_then(|v| v.parse().ok())
    }

    /// Headers of `record` with every retry header replaced by `self`.
    pub fn apply_to(&self, record: &InboundRecord) -> Vec<(String, String)> {
        let mut headers: Vec<(String, String)> = record
            .headers
            .iter()
            .filter(|(key, _)| !ALL.contains(&key.as_str()))
            .cloned()
            .collect();
        headers.extend(self.to_headers());
        headers
    }

    pub fn to_headers(&self) -> Vec<(String, String)> {
        vec![
            (ORIGINAL_TOPIC.to_string(), self.origin.topic.clone()),
            (ORIGINAL_PARTITION.to_string(), self.origin.partition.to_string()),
            (ORIGINAL_OFFSET.to_string(), self.origin.offset.to_string()),
            (ATTEMPT.to_string(), self.attempt.to_string()),
            (DUE_AT_MS.to_string(), self.due_at_ms.to_string()),
            (EXCEPTION_MESSAGE.to_string(), self.exception_message.clone()),
            (EXCEPTION_CLASS.to_string(), self.exception_class.to_string()),
        ]
    }
}
