//! Search index error types.
//!
//! This module defines the unified error type for all search index operations,
//! including both low-level backend errors and query validation errors.

use thiserror::Error;

/// Unified errors from search index operations.
///
/// Used by the `SearchIndexProvider` trait and `SearchIndexGateway` for all search index
/// operations.
#[derive(Debug, Clone, Error)]
pub enum SearchIndexError {
    /// Validation error (e.g., empty document id, zero page size).
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Failed to establish connection to the search index backend.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Failed to write a document.
    #[error("Index error: {0}")]
    IndexError(String),

    /// Failed to delete a document.
    #[error("Delete error: {0}")]
    DeleteError(String),

    /// Failed to read or search documents.
    #[error("Query error: {0}")]
    QueryError(String),

    /// Failed to create the search index or its alias.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    /// Failed to parse response from search index backend.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to serialize data for the search index backend.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl SearchIndexError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create an index error.
    pub fn index(msg: impl Into<String>) -> Self {
        Self::IndexError(msg.into())
    }

    /// Create a delete error.
    pub fn delete(msg: impl Into<String>) -> Self {
        Self::DeleteError(msg.into())
    }

    /// Create a query error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryError(msg.into())
    }

    /// Create an index creation error.
    pub fn index_creation(msg: impl Into<String>) -> Self {
        Self::IndexCreationError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Whether the request itself was invalid.
    ///
    /// Retrying an invalid request yields the same error, every other
    /// variant may succeed on a later attempt.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationError(_))
    }
}
