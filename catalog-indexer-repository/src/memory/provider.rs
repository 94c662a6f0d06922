use async_trait::async_trait;
use catalog_indexer_shared::EntityKind;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};
use tracing::debug;

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::memory::matcher;
use crate::query::QueryPlan;
use crate::types::SearchHits;

type Index = BTreeMap<String, Value>;

/// Search index held in process memory.
///
/// Documents are kept per kind in id order, which is also the tie-break
/// order for equal sort keys.
#[derive(Default)]
pub struct InMemoryProvider {
    indexes: RwLock<HashMap<EntityKind, Index>>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents stored for `kind`.
    pub fn len(&self, kind: EntityKind) -> usize {
        self.indexes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, kind: EntityKind) -> bool {
        self.len(kind) == 0
    }
}

#[async_trait]
impl SearchIndexProvider for InMemoryProvider {
    async fn ensure_index_exists(&self, kind: EntityKind) -> Result<(), SearchIndexError> {
        self.indexes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_default();
        Ok(())
    }

    async fn put_document(
        &self,
        kind: EntityKind,
        id: &str,
        document: &Value,
    ) -> Result<(), SearchIndexError> {
        self.indexes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_default()
            .insert(id.to_string(), document.clone());

        debug!(index = %kind, doc_id = %id, "Document stored in memory");
        Ok(())
    }

    async fn delete_document(&self, kind: EntityKind, id: &str) -> Result<(), SearchIndexError> {
        if let Some(index) = self
            .indexes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&kind)
        {
            index.remove(id);
        }
        Ok(())
    }

    async fn get_document(
        &self,
        kind: EntityKind,
        id: &str,
    ) -> Result<Option<Value>, SearchIndexError> {
        Ok(self
            .indexes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .and_then(|index| index.get(id).cloned()))
    }

    async fn get_documents(
        &self,
        kind: EntityKind,
        ids: &[String],
    ) -> Result<Vec<Value>, SearchIndexError> {
        let indexes = self.indexes.read().unwrap_or_else(PoisonError::into_inner);
        let Some(index) = indexes.get(&kind) else {
            return Ok(Vec::new());
        };

        Ok(ids.iter().filter_map(|id| index.get(id).cloned()).collect())
    }

    async fn search(
        &self,
        kind: EntityKind,
        plan: &QueryPlan,
    ) -> Result<SearchHits, SearchIndexError> {
        let indexes = self.indexes.read().unwrap_or_else(PoisonError::into_inner);
        let Some(index) = indexes.get(&kind) else {
            return Ok(SearchHits::default());
        };

        let mut matching: Vec<&Value> = index
            .values()
            .filter(|doc| matcher::matches_all(doc, &plan.must))
            .collect();
        matching.sort_by(|a, b| matcher::compare(a, b, &plan.sort));

        let total = matching.len() as u64;
        let documents = matching
            .into_iter()
            .skip(plan.from)
            .take(plan.size)
            .cloned()
            .collect();

        Ok(SearchHits::new(total, documents))
    }
}
