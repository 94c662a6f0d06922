//! OpenSearch index configuration and mappings.
//!
//! This module defines the index settings and mappings for the per-kind catalog indexes.

use catalog_indexer_shared::EntityKind;
use serde_json::{json, Value};

/// Configuration for one search index.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// The entity kind stored in this index.
    pub kind: EntityKind,
    /// The alias name for the search index (used for all operations).
    pub alias: String,
    /// The version number for the index (e.g., 0 for "videos_v0").
    pub version: u32,
}

impl IndexConfig {
    /// Create a new index configuration.
    ///
    /// # Arguments
    ///
    /// * `kind` - The entity kind stored in the index
    /// * `alias` - The index alias name
    /// * `version` - The version number
    pub fn new(kind: EntityKind, alias: impl Into<String>, version: u32) -> Self {
        Self {
            kind,
            alias: alias.into(),
            version,
        }
    }

    /// Index configuration using the kind's namespace as alias.
    pub fn for_kind(kind: EntityKind, version: u32) -> Self {
        Self::new(kind, kind.namespace(), version)
    }

    /// The physical index behind the alias.
    pub fn versioned_name(&self) -> String {
        get_versioned_index_name(&self.alias, Some(self.version))
    }
}

/// Get the versioned index name.
///
/// # Arguments
///
/// * `alias` - The index alias
/// * `version` - The version number (defaults to 0 if None)
///
/// # Returns
///
/// The versioned index name (e.g., "categories_v0")
pub fn get_versioned_index_name(alias: &str, version: Option<u32>) -> String {
    let v = version.unwrap_or(0);
    format!("{}_v{}", alias, v)
}

/// A text field with an exact keyword sub-field used for sorting.
fn text_with_keyword() -> Value {
    json!({
        "type": "text",
        "fields": {
            "keyword": {
                "type": "keyword",
                "ignore_above": 256
            }
        }
    })
}

/// Get the index settings and mappings for the index of `kind`.
///
/// Display fields (`name`, `title`) are `text` with a `keyword` sub-field so
/// that sorting is byte-exact. Ids and foreign-id sets are `keyword`.
///
/// # Sharding Configuration
///
/// - 1 primary shard
/// - 1 replica for redundancy
pub fn get_index_settings(kind: EntityKind) -> Value {
    let properties = match kind {
        EntityKind::Category => json!({
            "id": { "type": "keyword" },
            "name": text_with_keyword(),
            "description": { "type": "text" },
            "active": { "type": "boolean" },
            "created_at": { "type": "date" },
            "updated_at": { "type": "date" },
            "deleted_at": { "type": "date" }
        }),
        EntityKind::CastMember => json!({
            "id": { "type": "keyword" },
            "name": text_with_keyword(),
            "type": { "type": "keyword" },
            "created_at": { "type": "date" },
            "updated_at": { "type": "date" }
        }),
        EntityKind::Genre => json!({
            "id": { "type": "keyword" },
            "name": text_with_keyword(),
            "active": { "type": "boolean" },
            "categories": { "type": "keyword" },
            "created_at": { "type": "date" },
            "updated_at": { "type": "date" },
            "deleted_at": { "type": "date" }
        }),
        EntityKind::Video => json!({
            "id": { "type": "keyword" },
            "title": text_with_keyword(),
            "description": { "type": "text" },
            "launched_at": { "type": "integer" },
            "duration": { "type": "double" },
            "rating": { "type": "keyword" },
            "opened": { "type": "boolean" },
            "published": { "type": "boolean" },
            "video": { "type": "keyword", "index": false },
            "trailer": { "type": "keyword", "index": false },
            "banner": { "type": "keyword", "index": false },
            "thumbnail": { "type": "keyword", "index": false },
            "thumbnail_half": { "type": "keyword", "index": false },
            "categories": { "type": "keyword" },
            "cast_members": { "type": "keyword" },
            "genres": { "type": "keyword" },
            "created_at": { "type": "date" },
            "updated_at": { "type": "date" }
        }),
    };

    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 1
        },
        "mappings": {
            "properties": properties
        }
    })
}
