//! # Catalog Indexer
//!
//! Keeps the catalog search index in sync with the admin database. Change
//! events captured from the database arrive on Kafka, get resolved through
//! the owning services and are written to the search index.
//!
//! ## Architecture
//!
//! 1. **Consumer**: Receives change events from Kafka
//! 2. **Listener**: Decodes the envelope, enriches it and applies it to the index
//! 3. **Retry**: Escalates failed events through the retry topics
//! 4. **Dead letters**: Parks events that exhausted their retries
//! 5. **Orchestrator**: Runs one worker per topic stage
//!
//! ## Modules
//!
//! - [`codec`]: Change envelope decoding
//! - [`config`]: Configuration and dependency initialization
//! - [`consumer`]: Kafka consumer for change events
//! - [`dlt`]: Dead-letter records and sinks
//! - [`listener`]: Per-kind change handling
//! - [`orchestrator`]: Coordinates the workers
//! - [`producer`]: Kafka producer for retry and dead-letter topics
//! - [`retry`]: Retry topology and escalation
//! - [`errors`]: Error types for the indexer

pub mod codec;
pub mod config;
pub mod consumer;
pub mod dlt;
pub mod errors;
pub mod listener;
pub mod orchestrator;
pub mod producer;
pub mod retry;

pub use config::{Dependencies, IndexerConfig};
pub use errors::IngestError;

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Ingest error.
    #[error("Ingest error: {0}")]
    IngestError(#[from] IngestError),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
