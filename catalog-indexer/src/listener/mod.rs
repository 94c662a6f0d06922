//! Per-kind listeners: decode a change, then delete or enrich-and-upsert.

mod entity_listener;
mod errors;
mod use_cases;

pub use entity_listener::EntityListener;
pub use errors::{FailureClass, HandlerError};
pub use use_cases::{DeleteEntity, SaveEntity};

use async_trait::async_trait;
use catalog_indexer_shared::EntityKind;

/// What a handler did with a record it accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Heartbeat or tombstone.
    Ignored,
    Deleted { id: String },
    Upserted { id: String },
    /// The owning service no longer knows the entity.
    Skipped { id: String },
}

/// Applies one raw change record to the read model.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    fn kind(&self) -> EntityKind;

    async fn handle(&self, payload: Option<&[u8]>) -> Result<Outcome, HandlerError>;
}
