//! Outbound records: retry-stage and dead-letter publications.

mod kafka_publisher;

pub use kafka_publisher::{KafkaPublisher, ProducerConfig};

use async_trait::async_trait;

use crate::errors::IngestError;

/// A record to be written to a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRecord {
    pub topic: String,
    pub key: Option<Vec<u8>>,
    pub payload: Option<Vec<u8>>,
    pub headers: Vec<(String, String)>,
}

/// Writes records to the broker. `publish` returns once delivery is confirmed.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, record: OutboundRecord) -> Result<(), IngestError>;
}
