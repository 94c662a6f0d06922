//! Write-side collaborators invoked by the listeners.

use async_trait::async_trait;
use catalog_indexer_repository::{SearchIndexError, SearchIndexGateway};
use catalog_indexer_shared::SearchDocument;

/// Persists a resolved entity to the read model. Idempotent.
#[async_trait]
pub trait SaveEntity<E>: Send + Sync {
    async fn save(&self, entity: E) -> Result<(), SearchIndexError>;
}

/// Removes an entity from the read model. Deleting an absent id succeeds.
#[async_trait]
pub trait DeleteEntity: Send + Sync {
    async fn delete(&self, id: &str) -> Result<(), SearchIndexError>;
}

#[async_trait]
impl<E, D> SaveEntity<E> for SearchIndexGateway<D>
where
    E: Send + 'static,
    D: SearchDocument + From<E>,
{
    async fn save(&self, entity: E) -> Result<(), SearchIndexError> {
        self.upsert(&D::from(entity)).await
    }
}

#[async_trait]
impl<D: SearchDocument> DeleteEntity for SearchIndexGateway<D> {
    async fn delete(&self, id: &str) -> Result<(), SearchIndexError> {
        self.delete_by_id(id).await
    }
}
