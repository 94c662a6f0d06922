//! # Catalog Indexer Shared
//!
//! Shared data structures for the catalog indexer. It holds the resolved
//! entities fetched from the owning services, the documents stored in the
//! search index, and the query and pagination types used on the read path.

pub mod types;

pub use types::{
    CastMember, CastMemberDocument, CastMemberType, Category, CategoryDocument, EntityKind, Genre,
    GenreDocument, Pagination, SearchDocument, SearchFilters, SearchQuery, SortDirection, Video,
    VideoDocument,
};
