//! OpenSearch provider implementation.
//!
//! This module provides the concrete implementation of `SearchIndexProvider`
//! using the OpenSearch Rust crate.

use async_trait::async_trait;
use catalog_indexer_shared::EntityKind;
use opensearch::{
    http::response::Response,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{
        IndicesCreateParts, IndicesExistsAliasParts, IndicesExistsParts, IndicesPutAliasParts,
    },
    DeleteParts, GetParts, IndexParts, MgetParts, OpenSearch, SearchParts,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, error, info};
use url::Url;

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::opensearch::dsl::search_body;
use crate::opensearch::index_config::{get_index_settings, IndexConfig};
use crate::query::QueryPlan;
use crate::types::SearchHits;

/// OpenSearch provider implementation.
///
/// Holds one [`IndexConfig`] per entity kind. Every document operation goes
/// through the kind's alias, so a reindex only has to move the alias.
///
/// # Example
///
/// ```ignore
/// use catalog_indexer_repository::opensearch::IndexConfig;
/// use catalog_indexer_shared::EntityKind;
///
/// let indexes = EntityKind::ALL.map(|kind| IndexConfig::for_kind(kind, 0));
/// let provider = OpenSearchProvider::new("http://localhost:9200", indexes).await?;
/// provider.ensure_index_exists(EntityKind::Video).await?;
/// ```
pub struct OpenSearchProvider {
    client: OpenSearch,
    indexes: HashMap<EntityKind, IndexConfig>,
}

impl OpenSearchProvider {
    /// Create a new OpenSearch provider connected to the specified URL.
    ///
    /// The cluster is pinged once so an unreachable cluster fails here and
    /// not on the first document write.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    /// * `indexes` - The index configuration of every kind this provider serves
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchProvider)` - A new provider instance
    /// * `Err(SearchIndexError)` - If connection setup fails
    pub async fn new(
        url: &str,
        indexes: impl IntoIterator<Item = IndexConfig>,
    ) -> Result<Self, SearchIndexError> {
        let parsed_url =
            Url::parse(url).map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        let response = client
            .ping()
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;
        if !response.status_code().is_success() {
            return Err(SearchIndexError::connection(format!(
                "Ping failed with status {}",
                response.status_code()
            )));
        }

        let indexes: HashMap<EntityKind, IndexConfig> = indexes
            .into_iter()
            .map(|config| (config.kind, config))
            .collect();

        info!(
            url = %url,
            indexes = ?indexes.values().map(|c| c.versioned_name()).collect::<Vec<_>>(),
            "Created OpenSearch provider"
        );

        Ok(Self { client, indexes })
    }

    fn index(&self, kind: EntityKind) -> Result<&IndexConfig, SearchIndexError> {
        self.indexes.get(&kind).ok_or_else(|| {
            SearchIndexError::validation(format!("No index configured for {}", kind))
        })
    }

    async fn read_json(response: Response) -> Result<Value, SearchIndexError> {
        response
            .json::<Value>()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))
    }

    async fn failure_body(response: Response) -> String {
        response.text().await.unwrap_or_default()
    }
}

#[async_trait]
impl SearchIndexProvider for OpenSearchProvider {
    /// Create the versioned index with its mappings if it is missing, then
    /// point the alias at it.
    async fn ensure_index_exists(&self, kind: EntityKind) -> Result<(), SearchIndexError> {
        let config = self.index(kind)?;
        let index_name = config.versioned_name();

        let response = self
            .client
            .indices()
            .exists_alias(IndicesExistsAliasParts::Name(&[&config.alias]))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;
        if response.status_code().is_success() {
            debug!(alias = %config.alias, "Index alias already exists");
            return Ok(());
        }

        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[&index_name]))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        if response.status_code().as_u16() == 404 {
            let response = self
                .client
                .indices()
                .create(IndicesCreateParts::Index(&index_name))
                .body(get_index_settings(kind))
                .send()
                .await
                .map_err(|e| SearchIndexError::index_creation(e.to_string()))?;

            let status = response.status_code();
            if !status.is_success() {
                let error_body = Self::failure_body(response).await;
                error!(status = %status, body = %error_body, index = %index_name, "Index creation failed");
                return Err(SearchIndexError::index_creation(format!(
                    "Creating {} failed with status {}: {}",
                    index_name, status, error_body
                )));
            }
            info!(index = %index_name, "Created search index");
        }

        let response = self
            .client
            .indices()
            .put_alias(IndicesPutAliasParts::IndexName(&[&index_name], &config.alias))
            .send()
            .await
            .map_err(|e| SearchIndexError::index_creation(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = Self::failure_body(response).await;
            error!(status = %status, body = %error_body, alias = %config.alias, "Alias creation failed");
            return Err(SearchIndexError::index_creation(format!(
                "Creating alias {} failed with status {}: {}",
                config.alias, status, error_body
            )));
        }

        info!(index = %index_name, alias = %config.alias, "Search index alias ready");
        Ok(())
    }

    async fn put_document(
        &self,
        kind: EntityKind,
        id: &str,
        document: &Value,
    ) -> Result<(), SearchIndexError> {
        let config = self.index(kind)?;

        // The index API replaces the whole source, unlike _update which merges.
        let response = self
            .client
            .index(IndexParts::IndexId(&config.alias, id))
            .body(document)
            .send()
            .await
            .map_err(|e| SearchIndexError::index(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = Self::failure_body(response).await;
            error!(status = %status, body = %error_body, "Index request failed");
            return Err(SearchIndexError::index(format!(
                "Index failed with status {}: {}",
                status, error_body
            )));
        }

        debug!(index = %config.alias, doc_id = %id, "Document indexed");
        Ok(())
    }

    async fn delete_document(&self, kind: EntityKind, id: &str) -> Result<(), SearchIndexError> {
        let config = self.index(kind)?;

        let response = self
            .client
            .delete(DeleteParts::IndexId(&config.alias, id))
            .send()
            .await
            .map_err(|e| SearchIndexError::delete(e.to_string()))?;

        let status = response.status_code();

        // 404 is acceptable - document may not exist
        if !status.is_success() && status.as_u16() != 404 {
            let error_body = Self::failure_body(response).await;
            error!(status = %status, body = %error_body, "Delete request failed");
            return Err(SearchIndexError::delete(format!(
                "Delete failed with status {}: {}",
                status, error_body
            )));
        }

        debug!(index = %config.alias, doc_id = %id, "Document deleted");
        Ok(())
    }

    async fn get_document(
        &self,
        kind: EntityKind,
        id: &str,
    ) -> Result<Option<Value>, SearchIndexError> {
        let config = self.index(kind)?;

        let response = self
            .client
            .get(GetParts::IndexId(&config.alias, id))
            .send()
            .await
            .map_err(|e| SearchIndexError::query(e.to_string()))?;

        let status = response.status_code();
        if status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            let error_body = Self::failure_body(response).await;
            error!(status = %status, body = %error_body, "Get request failed");
            return Err(SearchIndexError::query(format!(
                "Get failed with status {}: {}",
                status, error_body
            )));
        }

        let mut body = Self::read_json(response).await?;
        Ok(body.get_mut("_source").map(Value::take))
    }

    async fn get_documents(
        &self,
        kind: EntityKind,
        ids: &[String],
    ) -> Result<Vec<Value>, SearchIndexError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let config = self.index(kind)?;

        let response = self
            .client
            .mget(MgetParts::Index(&config.alias))
            .body(json!({ "ids": ids }))
            .send()
            .await
            .map_err(|e| SearchIndexError::query(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = Self::failure_body(response).await;
            error!(status = %status, body = %error_body, "Multi-get request failed");
            return Err(SearchIndexError::query(format!(
                "Multi-get failed with status {}: {}",
                status, error_body
            )));
        }

        let mut body = Self::read_json(response).await?;
        let docs = match body.get_mut("docs").map(Value::take) {
            Some(Value::Array(docs)) => docs,
            _ => return Err(SearchIndexError::parse("Multi-get response has no docs")),
        };

        Ok(docs
            .into_iter()
            .filter(|doc| doc.get("found").and_then(Value::as_bool).unwrap_or(false))
            .filter_map(|mut doc| doc.get_mut("_source").map(Value::take))
            .collect())
    }

    async fn search(
        &self,
        kind: EntityKind,
        plan: &QueryPlan,
    ) -> Result<SearchHits, SearchIndexError> {
        let config = self.index(kind)?;
        let body = search_body(plan);

        debug!(index = %config.alias, query = %body, "Searching");

        let response = self
            .client
            .search(SearchParts::Index(&[&config.alias]))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::query(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = Self::failure_body(response).await;
            error!(status = %status, body = %error_body, "Search request failed");
            return Err(SearchIndexError::query(format!(
                "Search failed with status {}: {}",
                status, error_body
            )));
        }

        let mut body = Self::read_json(response).await?;
        parse_hits(&mut body)
    }
}

/// Extract the total count and source documents from a `_search` response.
fn parse_hits(body: &mut Value) -> Result<SearchHits, SearchIndexError> {
    let hits = body
        .get_mut("hits")
        .ok_or_else(|| SearchIndexError::parse("Search response has no hits"))?;

    let total = hits
        .get("total")
        .and_then(|total| total.get("value").or(Some(total)))
        .and_then(Value::as_u64)
        .ok_or_else(|| SearchIndexError::parse("Search response has no total"))?;

    let documents = match hits.get_mut("hits").map(Value::take) {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|mut hit| hit.get_mut("_source").map(Value::take))
            .collect(),
        _ => Vec::new(),
    };

    Ok(SearchHits::new(total, documents))
}
