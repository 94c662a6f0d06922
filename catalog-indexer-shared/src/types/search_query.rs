//! Search query types for the catalog read path.
//!
//! A [`SearchQuery`] is kind-agnostic. Each entity kind uses the subset of
//! [`SearchFilters`] that applies to it and ignores the rest.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("invalid sort direction '{}'", other)),
        }
    }
}

/// Entity-specific filters.
///
/// Multi-valued filters match documents holding any of the given values.
/// Filters on different fields are combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default)]
    pub categories: BTreeSet<String>,
    #[serde(default)]
    pub cast_members: BTreeSet<String>,
    #[serde(default)]
    pub genres: BTreeSet<String>,
    /// Launch year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launched_at: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
}

/// Search query parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Zero-based page index.
    #[serde(default)]
    pub page: usize,

    /// Page size. Must be greater than zero.
    #[serde(default = "default_per_page")]
    pub per_page: usize,

    /// Free-text terms. Blank means match all.
    #[serde(default)]
    pub terms: String,

    /// Display field to sort by, e.g. `name` or `title`.
    #[serde(default = "default_sort")]
    pub sort: String,

    #[serde(default)]
    pub direction: SortDirection,

    #[serde(default)]
    pub filters: SearchFilters,
}

fn default_per_page() -> usize {
    10
}

fn default_sort() -> String {
    "name".to_string()
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            page: 0,
            per_page: default_per_page(),
            terms: String::new(),
            sort: default_sort(),
            direction: SortDirection::Asc,
            filters: SearchFilters::default(),
        }
    }
}

impl SearchQuery {
    /// Create a query for one page, sorted by `name` ascending.
    ///
    /// # Example
    ///
    /// ```
    /// use catalog_indexer_shared::{SearchQuery, SortDirection};
    ///
    /// let query = SearchQuery::new(0, 20)
    ///     .with_terms("action")
    ///     .sorted_by("title", SortDirection::Desc);
    /// ```
    pub fn new(page: usize, per_page: usize) -> Self {
        Self {
            page,
            per_page,
            ..Self::default()
        }
    }

    pub fn with_terms(mut self, terms: impl Into<String>) -> Self {
        self.terms = terms.into();
        self
    }

    pub fn sorted_by(mut self, sort: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = sort.into();
        self.direction = direction;
        self
    }

    pub fn with_categories<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters.categories = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cast_members<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters.cast_members = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_genres<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters.genres = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn launched_in(mut self, year: i32) -> Self {
        self.filters.launched_at = Some(year);
        self
    }

    pub fn with_rating(mut self, rating: impl Into<String>) -> Self {
        self.filters.rating = Some(rating.into());
        self
    }

    /// Offset of the first item on the requested page.
    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.per_page)
    }

    /// Free-text terms, if any are present.
    pub fn terms(&self) -> Option<&str> {
        let terms = self.terms.trim();
        (!terms.is_empty()).then_some(terms)
    }

    /// Validate the query parameters.
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.per_page == 0 {
            return Err("per_page must be greater than zero".to_string());
        }

        if self.sort.trim().is_empty() {
            return Err("sort field cannot be empty".to_string());
        }

        Ok(())
    }
}
