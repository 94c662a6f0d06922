//! The contract shared by every document stored in the search index.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::types::EntityKind;

/// A document stored in one of the catalog search indexes.
///
/// There is exactly one document per entity id and it is always written
/// wholesale. The id never changes once the document exists.
pub trait SearchDocument: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// The kind of entity this document represents.
    const KIND: EntityKind;

    /// The document id, equal to the owning entity's id.
    fn id(&self) -> &str;
}
