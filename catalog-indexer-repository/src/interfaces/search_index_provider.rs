//! Search index provider trait definition.
//!
//! This module defines the abstract interface for search index operations,
//! allowing for different backend implementations (OpenSearch, in-memory, etc.).

use async_trait::async_trait;
use catalog_indexer_shared::EntityKind;
use serde_json::Value;

use crate::errors::SearchIndexError;
use crate::query::QueryPlan;
use crate::types::SearchHits;

/// Abstracts the underlying search index implementation.
///
/// Providers store JSON documents keyed by id, one index per [`EntityKind`].
/// They know nothing about the entity types themselves: typing lives in
/// `SearchIndexGateway`, and query semantics arrive as a backend-neutral
/// [`QueryPlan`].
///
/// # Index Initialization
///
/// Implementations should call `ensure_index_exists` during application startup to ensure
/// the search index and any aliases are properly configured before performing document operations.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Ensure the index for `kind` and any required aliases exist, creating them if necessary.
    async fn ensure_index_exists(&self, kind: EntityKind) -> Result<(), SearchIndexError>;

    /// Store a document under `id`, replacing any existing document wholesale.
    ///
    /// # Arguments
    ///
    /// * `kind` - The index to write to
    /// * `id` - The document id
    /// * `document` - The full document body
    async fn put_document(
        &self,
        kind: EntityKind,
        id: &str,
        document: &Value,
    ) -> Result<(), SearchIndexError>;

    /// Delete a document from the search index.
    ///
    /// If the document doesn't exist, the operation is considered successful.
    async fn delete_document(&self, kind: EntityKind, id: &str) -> Result<(), SearchIndexError>;

    /// Fetch a single document by id.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Value))` - The stored document
    /// * `Ok(None)` - If no document has this id
    /// * `Err(SearchIndexError)` - If the lookup fails
    async fn get_document(
        &self,
        kind: EntityKind,
        id: &str,
    ) -> Result<Option<Value>, SearchIndexError>;

    /// Fetch several documents by id in one request.
    ///
    /// Ids without a stored document are skipped. The result order is unspecified.
    async fn get_documents(
        &self,
        kind: EntityKind,
        ids: &[String],
    ) -> Result<Vec<Value>, SearchIndexError>;

    /// Run a query plan and return the requested page plus the total match count.
    async fn search(
        &self,
        kind: EntityKind,
        plan: &QueryPlan,
    ) -> Result<SearchHits, SearchIndexError>;
}
