//! Configuration and dependency wiring.

mod dependencies;
mod indexer_config;

pub use dependencies::Dependencies;
pub use indexer_config::{
    ConnectionMode, DeadLetterMode, EntitySettings, IndexBackend, IndexSettings, IndexerConfig,
    KafkaSettings, ListenerSettings,
};
