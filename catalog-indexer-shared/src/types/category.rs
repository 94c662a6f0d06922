//! Category entity and its search document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::serde_ext::{active_or_default, default_active};
use crate::types::{EntityKind, SearchDocument};

/// A category as resolved from the categories service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Absent or `null` means active.
    #[serde(
        default = "default_active",
        deserialize_with = "active_or_default"
    )]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Category as stored in the `categories` index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDocument {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SearchDocument for CategoryDocument {
    const KIND: EntityKind = EntityKind::Category;

    fn id(&self) -> &str {
        &self.id
    }
}

impl From<Category> for CategoryDocument {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            description: category.description,
            active: category.is_active,
            created_at: category.created_at,
            updated_at: category.updated_at,
            deleted_at: category.deleted_at,
        }
    }
}

impl From<CategoryDocument> for Category {
    fn from(doc: CategoryDocument) -> Self {
        Self {
            id: doc.id,
            name: doc.name,
            description: doc.description,
            is_active: doc.active,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
            deleted_at: doc.deleted_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_active_flag_defaults_to_true() {
        let json = r#"{
            "id": "45ee",
            "name": "Movies",
            "created_at": "2024-03-01T10:00:00Z",
            "updated_at": "2024-03-01T10:00:00Z"
        }"#;

        let category: Category = serde_json::from_str(json).unwrap();
        assert!(category.is_active);
        assert!(category.description.is_none());
        assert!(category.deleted_at.is_none());
    }

    #[test]
    fn test_null_active_flag_defaults_to_true() {
        let json = r#"{
            "id": "45ee",
            "name": "Movies",
            "description": "The most watched",
            "is_active": null,
            "created_at": "2024-03-01T10:00:00Z",
            "updated_at": "2024-03-01T10:00:00Z",
            "deleted_at": null
        }"#;

        let category: Category = serde_json::from_str(json).unwrap();
        assert!(category.is_active);
    }

    #[test]
    fn test_inactive_category_survives_document_conversion() {
        let json = r#"{
            "id": "45ee",
            "name": "Movies",
            "is_active": false,
            "created_at": "2024-03-01T10:00:00Z",
            "updated_at": "2024-03-02T10:00:00Z",
            "deleted_at": "2024-03-02T10:00:00Z"
        }"#;
        let category: Category = serde_json::from_str(json).unwrap();

        let doc = CategoryDocument::from(category.clone());
        assert_eq!(doc.id(), "45ee");
        assert!(!doc.active);

        let as_json = serde_json::to_value(&doc).unwrap();
        assert_eq!(as_json["active"], false);
        assert!(as_json.get("is_active").is_none());

        assert_eq!(Category::from(doc), category);
    }
}
