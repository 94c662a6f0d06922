use catalog_indexer_shared::SortDirection;
use serde_json::Value;

/// Suffix of the exact, non-tokenized variant of a text field.
pub const KEYWORD_SUFFIX: &str = ".keyword";

/// A single filter. All predicates of a plan must hold.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// At least one of `fields` contains `value` as a substring.
    Contains { fields: Vec<String>, value: String },
    /// `field` holds at least one of `values`.
    AnyOf { field: String, values: Vec<String> },
    /// `field` equals `value`.
    Equals { field: String, value: Value },
}

impl Predicate {
    pub fn contains<I, S>(fields: I, value: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Contains {
            fields: fields.into_iter().map(Into::into).collect(),
            value: value.into(),
        }
    }

    pub fn any_of<I, S>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AnyOf {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equals {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Sort order of a plan.
#[derive(Debug, Clone, PartialEq)]
pub struct SortSpec {
    /// Field as the backend should sort on it, e.g. `name.keyword`.
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Whether the sort uses the exact keyword variant of a text field.
    pub fn is_keyword(&self) -> bool {
        self.field.ends_with(KEYWORD_SUFFIX)
    }

    /// Name of the stored field behind the sort field.
    pub fn source_field(&self) -> &str {
        self.field
            .strip_suffix(KEYWORD_SUFFIX)
            .unwrap_or(&self.field)
    }
}

/// A fully resolved query: filters, sort order and the page window.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    /// Conjunction of predicates. Empty matches everything.
    pub must: Vec<Predicate>,
    pub sort: SortSpec,
    /// Number of matching documents to skip.
    pub from: usize,
    /// Maximum number of documents to return.
    pub size: usize,
}

impl QueryPlan {
    pub fn matches_all(&self) -> bool {
        self.must.is_empty()
    }
}
