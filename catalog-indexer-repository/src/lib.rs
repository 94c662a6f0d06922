//! # Catalog Indexer Repository
//!
//! The search index gateway for the catalog indexer. It includes the error
//! type, the backend-neutral query port, the `SearchIndexProvider` backend
//! interface with OpenSearch and in-memory implementations, and the typed
//! `SearchIndexGateway` used by the listeners and the read path.

pub mod config;
pub mod errors;
pub mod gateway;
pub mod interfaces;
pub mod memory;
pub mod opensearch;
pub mod query;
pub mod types;
pub mod utils;

pub use config::GatewayConfig;
pub use errors::SearchIndexError;
pub use gateway::SearchIndexGateway;
pub use interfaces::SearchIndexProvider;
pub use memory::InMemoryProvider;
pub use opensearch::OpenSearchProvider;
pub use query::{plan_query, Predicate, QueryPlan, SortSpec};
pub use types::SearchHits;
pub use utils::validate_document_id;
