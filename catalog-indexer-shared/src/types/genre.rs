//! Genre entity and its search document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::types::serde_ext::{active_or_default, default_active, set_or_empty};
use crate::types::{EntityKind, SearchDocument};

/// A genre as resolved from the genres service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub id: String,
    pub name: String,
    #[serde(
        default = "default_active",
        deserialize_with = "active_or_default"
    )]
    pub is_active: bool,
    /// Ids of the categories this genre belongs to.
    #[serde(default, deserialize_with = "set_or_empty")]
    pub categories_id: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Genre as stored in the `genres` index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreDocument {
    pub id: String,
    pub name: String,
    pub active: bool,
    #[serde(default, deserialize_with = "set_or_empty")]
    pub categories: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SearchDocument for GenreDocument {
    const KIND: EntityKind = EntityKind::Genre;

    fn id(&self) -> &str {
        &self.id
    }
}

impl From<Genre> for GenreDocument {
    fn from(genre: Genre) -> Self {
        Self {
            id: genre.id,
            name: genre.name,
            active: genre.is_active,
            categories: genre.categories_id,
            created_at: genre.created_at,
            updated_at: genre.updated_at,
            deleted_at: genre.deleted_at,
        }
    }
}

impl From<GenreDocument> for Genre {
    fn from(doc: GenreDocument) -> Self {
        Self {
            id: doc.id,
            name: doc.name,
            is_active: doc.active,
            categories_id: doc.categories,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
            deleted_at: doc.deleted_at,
        }
    }
}
