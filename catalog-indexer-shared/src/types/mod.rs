//! Core data structures shared across the catalog indexer crates.

pub mod cast_member;
pub mod category;
pub mod entity_kind;
pub mod genre;
pub mod pagination;
pub mod search_document;
pub mod search_query;
mod serde_ext;
pub mod video;

pub use cast_member::{CastMember, CastMemberDocument, CastMemberType};
pub use category::{Category, CategoryDocument};
pub use entity_kind::EntityKind;
pub use genre::{Genre, GenreDocument};
pub use pagination::Pagination;
pub use search_document::SearchDocument;
pub use search_query::{SearchFilters, SearchQuery, SortDirection};
pub use video::{Video, VideoDocument};
