//! Paged result type returned by the read path.

use serde::{Deserialize, Serialize};

/// One page of results.
///
/// `total` is the number of matching items before paging, so it does not
/// change as the caller walks through the pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pagination<T> {
    pub current_page: usize,
    pub per_page: usize,
    pub total: u64,
    pub items: Vec<T>,
}

impl<T> Pagination<T> {
    pub fn new(current_page: usize, per_page: usize, total: u64, items: Vec<T>) -> Self {
        Self {
            current_page,
            per_page,
            total,
            items,
        }
    }

    /// Convert the items while keeping the page metadata.
    pub fn map<U, F>(self, f: F) -> Pagination<U>
    where
        F: FnMut(T) -> U,
    {
        Pagination {
            current_page: self.current_page,
            per_page: self.per_page,
            total: self.total,
            items: self.items.into_iter().map(f).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
