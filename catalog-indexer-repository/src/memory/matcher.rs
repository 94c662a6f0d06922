//! Plan evaluation over JSON documents.

use serde_json::Value;
use std::cmp::Ordering;

use crate::query::{Predicate, SortSpec};
use catalog_indexer_shared::SortDirection;

/// Whether `document` satisfies every predicate.
pub(crate) fn matches_all(document: &Value, predicates: &[Predicate]) -> bool {
    predicates.iter().all(|predicate| matches(document, predicate))
}

fn matches(document: &Value, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Contains { fields, value } => {
            let needle = value.to_lowercase();
            fields
                .iter()
                .filter_map(|field| document.get(field))
                .any(|field| values(field).any(|v| contains(v, &needle)))
        }
        Predicate::AnyOf { field, values: wanted } => document
            .get(field)
            .map(|field| {
                values(field).any(|v| v.as_str().is_some_and(|s| wanted.iter().any(|w| w == s)))
            })
            .unwrap_or(false),
        Predicate::Equals { field, value } => document
            .get(field)
            .map(|field| values(field).any(|v| equals(v, value)))
            .unwrap_or(false),
    }
}

/// Scalars of a field, flattening one level of arrays.
fn values(field: &Value) -> Box<dyn Iterator<Item = &Value> + '_> {
    match field {
        Value::Array(items) => Box::new(items.iter()),
        other => Box::new(std::iter::once(other)),
    }
}

fn contains(value: &Value, needle: &str) -> bool {
    value
        .as_str()
        .is_some_and(|s| s.to_lowercase().contains(needle))
}

fn equals(stored: &Value, expected: &Value) -> bool {
    match (stored.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => stored == expected,
    }
}

/// Compare two documents by the plan's sort field.
///
/// Strings compare byte-wise, numbers numerically. Documents missing the
/// field sort last regardless of direction.
pub(crate) fn compare(a: &Value, b: &Value, sort: &SortSpec) -> Ordering {
    let field = sort.source_field();
    match (a.get(field), b.get(field)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => {
            let ordering = compare_values(x, y);
            match sort.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        }
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::String(x), Value::String(y)) => x.as_bytes().cmp(y.as_bytes()),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => a.to_string().cmp(&b.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_contains_is_case_insensitive() {
        let doc = json!({ "name": "Documentaries", "description": null });
        assert!(matches(&doc, &Predicate::contains(["name"], "MENTA")));
        assert!(!matches(&doc, &Predicate::contains(["description"], "doc")));
    }

    #[test]
    fn test_contains_on_any_field() {
        let doc = json!({ "name": "Movies", "description": "Best documentaries" });
        assert!(matches(
            &doc,
            &Predicate::contains(["name", "description"], "docu")
        ));
    }

    #[test]
    fn test_any_of_on_array_field() {
        let doc = json!({ "categories": ["c1", "c3"] });
        assert!(matches(&doc, &Predicate::any_of("categories", ["c2", "c3"])));
        assert!(!matches(&doc, &Predicate::any_of("categories", ["c2"])));
        assert!(!matches(&doc, &Predicate::any_of("genres", ["c1"])));
    }

    #[test]
    fn test_equals_numbers_and_bools() {
        let doc = json!({ "launched_at": 2020, "published": true, "rating": "L" });
        assert!(matches(&doc, &Predicate::equals("launched_at", 2020)));
        assert!(matches(&doc, &Predicate::equals("published", true)));
        assert!(!matches(&doc, &Predicate::equals("published", false)));
        assert!(matches(&doc, &Predicate::equals("rating", "L")));
    }

    #[test]
    fn test_keyword_sort_is_byte_wise() {
        let sort = SortSpec::new("name.keyword", SortDirection::Asc);
        let upper = json!({ "name": "Zebra" });
        let lower = json!({ "name": "apple" });

        // 'Z' (0x5A) sorts before 'a' (0x61)
        assert_eq!(compare(&upper, &lower, &sort), Ordering::Less);
    }

    #[test]
    fn test_missing_sort_field_sorts_last() {
        let sort = SortSpec::new("updated_at", SortDirection::Desc);
        let present = json!({ "updated_at": "2024-01-01T00:00:00Z" });
        let missing = json!({});

        assert_eq!(compare(&present, &missing, &sort), Ordering::Less);
        assert_eq!(compare(&missing, &present, &sort), Ordering::Greater);
    }
}
