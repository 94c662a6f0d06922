//! Utility functions for the catalog indexer repository.

use crate::errors::SearchIndexError;

/// Validate a document id before it is sent to a backend.
///
/// Ids must be non-empty and must not contain whitespace or `/`, which would
/// change the request path on HTTP backends.
///
/// # Example
///
/// ```
/// use catalog_indexer_repository::validate_document_id;
///
/// assert!(validate_document_id("7f3c4e0a9d2b").is_ok());
/// assert!(validate_document_id("").is_err());
/// ```
pub fn validate_document_id(id: &str) -> Result<(), SearchIndexError> {
    if id.is_empty() {
        return Err(SearchIndexError::validation("document id is required"));
    }

    if id.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(SearchIndexError::validation(format!(
            "document id '{}' contains invalid characters",
            id
        )));
    }

    Ok(())
}
