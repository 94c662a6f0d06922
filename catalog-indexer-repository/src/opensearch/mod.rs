//! OpenSearch implementation of the search index provider.
//!
//! This module provides a concrete implementation of `SearchIndexProvider`
//! using OpenSearch as the backend.

mod dsl;
mod index_config;
mod provider;

pub use dsl::{escape_query_string, search_body};
pub use index_config::{get_index_settings, get_versioned_index_name, IndexConfig};
pub use provider::OpenSearchProvider;
