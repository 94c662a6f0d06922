//! Consumer module for the catalog indexer.
//!
//! Provides the [`Consumer`] seam and its Kafka implementation.

mod kafka_consumer;
mod messages;

pub use kafka_consumer::{KafkaConsumer, KafkaConsumerConfig};
pub use messages::{InboundRecord, RecordOffset, StreamMessage};

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

use crate::errors::IngestError;

/// Source of records for one listener instance.
///
/// `run` forwards every record through `sender` and commits a record's
/// offset once a successful acknowledgment for it arrives on `ack_receiver`.
#[async_trait]
pub trait Consumer: Send + Sync {
    fn subscribe(&self) -> Result<(), IngestError>;

    async fn run(
        &self,
        sender: mpsc::Sender<StreamMessage>,
        ack_receiver: mpsc::Receiver<StreamMessage>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), IngestError>;
}
