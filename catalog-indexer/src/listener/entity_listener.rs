use async_trait::async_trait;
use catalog_indexer_client::{EntityClient, Resource};
use catalog_indexer_shared::EntityKind;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::codec::{decode, Decoded, Operation};
use crate::listener::{DeleteEntity, HandlerError, MessageHandler, Outcome, SaveEntity};

/// Listener for one entity kind.
///
/// Deletes go straight to the index. Every other operation resolves the
/// entity through the enrichment client and upserts what it returns; an
/// entity the owning service no longer knows is skipped.
pub struct EntityListener<E: Resource> {
    client: Arc<dyn EntityClient<E>>,
    save: Arc<dyn SaveEntity<E>>,
    delete: Arc<dyn DeleteEntity>,
}

impl<E: Resource> EntityListener<E> {
    pub fn new(
        client: Arc<dyn EntityClient<E>>,
        save: Arc<dyn SaveEntity<E>>,
        delete: Arc<dyn DeleteEntity>,
    ) -> Self {
        Self {
            client,
            save,
            delete,
        }
    }
}

#[async_trait]
impl<E: Resource> MessageHandler for EntityListener<E> {
    fn kind(&self) -> EntityKind {
        E::KIND
    }

    #[instrument(skip(self, payload), fields(kind = %E::KIND))]
    async fn handle(&self, payload: Option<&[u8]>) -> Result<Outcome, HandlerError> {
        let envelope = match decode(payload)? {
            Decoded::Ignorable => {
                debug!("Ignoring heartbeat");
                return Ok(Outcome::Ignored);
            }
            Decoded::Change(envelope) => envelope,
        };

        let id = envelope.entity_id().to_string();

        if envelope.operation == Operation::Delete {
            self.delete.delete(&id).await?;
            info!(entity_id = %id, "Entity deleted from index");
            return Ok(Outcome::Deleted { id });
        }

        match self.client.fetch(&id).await? {
            Some(entity) => {
                self.save.save(entity).await?;
                info!(entity_id = %id, operation = %envelope.operation, "Entity indexed");
                Ok(Outcome::Upserted { id })
            }
            None => {
                warn!(entity_id = %id, "Entity not found in owning service, skipping");
                Ok(Outcome::Skipped { id })
            }
        }
    }
}
