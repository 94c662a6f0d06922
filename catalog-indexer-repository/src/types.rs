//! Response types for search index operations.

use serde_json::Value;

/// Raw hits returned by a backend search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHits {
    /// Number of documents matching the query before paging.
    pub total: u64,
    /// Source documents of the requested page, in sort order.
    pub documents: Vec<Value>,
}

impl SearchHits {
    pub fn new(total: u64, documents: Vec<Value>) -> Self {
        Self { total, documents }
    }
}
