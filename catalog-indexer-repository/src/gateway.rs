//! Typed search index gateway.
//!
//! This is the API the listeners and the read path use. It validates
//! input, converts between typed documents and JSON, plans queries and
//! delegates storage to a [`SearchIndexProvider`].

use catalog_indexer_shared::{Pagination, SearchDocument, SearchQuery};
use serde_json::Value;
use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::config::GatewayConfig;
use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::query::plan_query;
use crate::utils::validate_document_id;

/// Gateway over the index of one document type.
///
/// Upserts and deletes are idempotent: writing the same document twice
/// leaves one identical document, and deleting an absent id succeeds.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use catalog_indexer_repository::{InMemoryProvider, SearchIndexGateway};
/// use catalog_indexer_shared::{GenreDocument, SearchQuery};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = Arc::new(InMemoryProvider::new());
/// let genres: SearchIndexGateway<GenreDocument> = SearchIndexGateway::new(provider);
///
/// let page = genres
///     .find_all(&SearchQuery::new(0, 10).with_categories(["c1"]))
///     .await?;
/// println!("{} genres in c1", page.total);
/// # Ok(())
/// # }
/// ```
pub struct SearchIndexGateway<D: SearchDocument> {
    provider: Arc<dyn SearchIndexProvider>,
    config: GatewayConfig,
    _document: PhantomData<fn() -> D>,
}

impl<D: SearchDocument> Clone for SearchIndexGateway<D> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            config: self.config.clone(),
            _document: PhantomData,
        }
    }
}

impl<D: SearchDocument> SearchIndexGateway<D> {
    /// Create a new gateway with default configuration.
    pub fn new(provider: Arc<dyn SearchIndexProvider>) -> Self {
        Self::with_config(provider, GatewayConfig::default())
    }

    /// Create a new gateway with custom configuration.
    pub fn with_config(provider: Arc<dyn SearchIndexProvider>, config: GatewayConfig) -> Self {
        Self {
            provider,
            config,
            _document: PhantomData,
        }
    }

    /// Store `document`, replacing any previous document with the same id.
    #[instrument(skip(self, document), fields(kind = %D::KIND, doc_id = %document.id()))]
    pub async fn upsert(&self, document: &D) -> Result<(), SearchIndexError> {
        validate_document_id(document.id())?;

        let body = serde_json::to_value(document)
            .map_err(|e| SearchIndexError::serialization(e.to_string()))?;

        self.provider
            .put_document(D::KIND, document.id(), &body)
            .await
    }

    /// Remove the document with `id`. Absent ids are not an error.
    #[instrument(skip(self), fields(kind = %D::KIND))]
    pub async fn delete_by_id(&self, id: &str) -> Result<(), SearchIndexError> {
        validate_document_id(id)?;
        self.provider.delete_document(D::KIND, id).await
    }

    /// Look up one document.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<D>, SearchIndexError> {
        validate_document_id(id)?;

        self.provider
            .get_document(D::KIND, id)
            .await?
            .map(decode)
            .transpose()
    }

    /// Run a search and return one page of documents.
    ///
    /// `total` counts every match, independent of the page size.
    #[instrument(skip(self, query), fields(kind = %D::KIND, page = query.page, per_page = query.per_page))]
    pub async fn find_all(&self, query: &SearchQuery) -> Result<Pagination<D>, SearchIndexError> {
        if let Some(max) = self.config.max_page_size {
            if query.per_page > max {
                return Err(SearchIndexError::validation(format!(
                    "per_page {} exceeds maximum {}",
                    query.per_page, max
                )));
            }
        }

        let plan = plan_query(D::KIND, query)?;
        let hits = self.provider.search(D::KIND, &plan).await?;

        let items = hits
            .documents
            .into_iter()
            .map(decode)
            .collect::<Result<Vec<D>, _>>()?;

        debug!(total = hits.total, returned = items.len(), "Search completed");
        Ok(Pagination::new(query.page, query.per_page, hits.total, items))
    }

    /// Fetch every stored document whose id is in `ids`.
    ///
    /// An empty set returns an empty result without calling the backend.
    /// Large sets are fetched in batches of `max_batch_size`.
    pub async fn find_all_by_id(&self, ids: &BTreeSet<String>) -> Result<Vec<D>, SearchIndexError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = ids.iter().cloned().collect();
        let mut documents = Vec::with_capacity(ids.len());

        for chunk in ids.chunks(self.config.max_batch_size.max(1)) {
            for raw in self.provider.get_documents(D::KIND, chunk).await? {
                documents.push(decode(raw)?);
            }
        }

        Ok(documents)
    }
}

fn decode<D: SearchDocument>(raw: Value) -> Result<D, SearchIndexError> {
    serde_json::from_value(raw).map_err(|e| SearchIndexError::parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryPlan;
    use crate::types::SearchHits;
    use async_trait::async_trait;
    use catalog_indexer_shared::{CategoryDocument, EntityKind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider that counts calls and stores nothing.
    #[derive(Default)]
    struct CountingProvider {
        gets: AtomicUsize,
        searches: AtomicUsize,
    }

    #[async_trait]
    impl SearchIndexProvider for CountingProvider {
        async fn ensure_index_exists(&self, _kind: EntityKind) -> Result<(), SearchIndexError> {
            Ok(())
        }

        async fn put_document(
            &self,
            _kind: EntityKind,
            _id: &str,
            _document: &Value,
        ) -> Result<(), SearchIndexError> {
            Ok(())
        }

        async fn delete_document(
            &self,
            _kind: EntityKind,
            _id: &str,
        ) -> Result<(), SearchIndexError> {
            Ok(())
        }

        async fn get_document(
            &self,
            _kind: EntityKind,
            _id: &str,
        ) -> Result<Option<Value>, SearchIndexError> {
            Ok(Some(serde_json::json!({ "unexpected": true })))
        }

        async fn get_documents(
            &self,
            _kind: EntityKind,
            ids: &[String],
        ) -> Result<Vec<Value>, SearchIndexError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            assert!(ids.len() <= 2);
            Ok(Vec::new())
        }

        async fn search(
            &self,
            _kind: EntityKind,
            _plan: &QueryPlan,
        ) -> Result<SearchHits, SearchIndexError> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            Ok(SearchHits::default())
        }
    }

    #[tokio::test]
    async fn test_find_all_by_id_with_empty_set_skips_backend() {
        let provider = Arc::new(CountingProvider::default());
        let gateway: SearchIndexGateway<CategoryDocument> = SearchIndexGateway::new(provider.clone());

        let result = gateway.find_all_by_id(&BTreeSet::new()).await.unwrap();

        assert!(result.is_empty());
        assert_eq!(provider.gets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_find_all_by_id_is_batched() {
        let provider = Arc::new(CountingProvider::default());
        let gateway: SearchIndexGateway<CategoryDocument> =
            SearchIndexGateway::with_config(provider.clone(), GatewayConfig::with_max_batch_size(2));

        let ids: BTreeSet<String> = ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect();
        gateway.find_all_by_id(&ids).await.unwrap();

        assert_eq!(provider.gets.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_oversized_page_is_rejected_before_search() {
        let provider = Arc::new(CountingProvider::default());
        let gateway: SearchIndexGateway<CategoryDocument> = SearchIndexGateway::new(provider.clone());

        let result = gateway.find_all(&SearchQuery::new(0, 5000)).await;

        assert!(matches!(result, Err(SearchIndexError::ValidationError(_))));
        assert_eq!(provider.searches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_undecodable_document_is_a_parse_error() {
        let provider = Arc::new(CountingProvider::default());
        let gateway: SearchIndexGateway<CategoryDocument> = SearchIndexGateway::new(provider);

        let result = gateway.find_by_id("abc").await;
        assert!(matches!(result, Err(SearchIndexError::ParseError(_))));
    }

    #[tokio::test]
    async fn test_empty_id_is_rejected() {
        let provider = Arc::new(CountingProvider::default());
        let gateway: SearchIndexGateway<CategoryDocument> = SearchIndexGateway::new(provider);

        assert!(gateway.delete_by_id("").await.is_err());
        assert!(gateway.find_by_id("").await.is_err());
    }
}
