//! Error types for the catalog indexer pipeline plumbing.

use thiserror::Error;

/// Errors raised by the Kafka and channel plumbing around the handlers.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Kafka-related error.
    #[error("Kafka error: {0}")]
    KafkaError(String),

    /// A record could not be handed to the next stage.
    #[error("Publish error: {0}")]
    PublishError(String),

    /// Channel communication error.
    #[error("Channel error: {0}")]
    ChannelError(String),
}

impl IngestError {
    pub fn kafka(msg: impl Into<String>) -> Self {
        Self::KafkaError(msg.into())
    }

    pub fn publish(msg: impl Into<String>) -> Self {
        Self::PublishError(msg.into())
    }
}

impl From<rdkafka::error::KafkaError> for IngestError {
    fn from(err: rdkafka::error::KafkaError) -> Self {
        Self::KafkaError(err.to_string())
    }
}
