//! Translation of query plans into the OpenSearch query DSL.

use serde_json::{json, Map, Value};

use crate::query::{Predicate, QueryPlan};

/// Characters with a meaning in `query_string` syntax.
const RESERVED: &[char] = &[
    '\\', '+', '-', '=', '&', '|', '>', '<', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~',
    '*', '?', ':', '/',
];

/// Escape user terms for use inside a `query_string` query.
///
/// Whitespace is escaped too, so multi-word terms are matched as one
/// contiguous substring.
pub fn escape_query_string(terms: &str) -> String {
    let mut escaped = String::with_capacity(terms.len());
    for c in terms.chars() {
        if RESERVED.contains(&c) || c.is_whitespace() {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn predicate_clause(predicate: &Predicate) -> Value {
    match predicate {
        Predicate::Contains { fields, value } => json!({
            "query_string": {
                "fields": fields,
                "query": format!("*{}*", escape_query_string(value)),
            }
        }),
        Predicate::AnyOf { field, values } => {
            let mut terms = Map::new();
            terms.insert(field.clone(), json!(values));
            json!({ "terms": terms })
        }
        Predicate::Equals { field, value } => {
            let mut term = Map::new();
            term.insert(field.clone(), value.clone());
            json!({ "term": term })
        }
    }
}

/// Build the body of a `_search` request for `plan`.
pub fn search_body(plan: &QueryPlan) -> Value {
    let query = if plan.matches_all() {
        json!({ "match_all": {} })
    } else {
        let must: Vec<Value> = plan.must.iter().map(predicate_clause).collect();
        json!({ "bool": { "must": must } })
    };

    let mut sort = Map::new();
    sort.insert(
        plan.sort.field.clone(),
        json!({
            "order": plan.sort.direction.as_str(),
            "unmapped_type": "keyword",
        }),
    );

    json!({
        "query": query,
        "sort": [sort],
        "from": plan.from,
        "size": plan.size,
        "track_total_hits": true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SortSpec;
    use catalog_indexer_shared::SortDirection;

    fn plan(must: Vec<Predicate>) -> QueryPlan {
        QueryPlan {
            must,
            sort: SortSpec::new("name.keyword", SortDirection::Desc),
            from: 20,
            size: 10,
        }
    }

    #[test]
    fn test_empty_plan_is_match_all() {
        let body = search_body(&plan(vec![]));

        assert_eq!(body["query"], json!({ "match_all": {} }));
        assert_eq!(body["from"], 20);
        assert_eq!(body["size"], 10);
        assert_eq!(body["track_total_hits"], true);
        assert_eq!(body["sort"][0]["name.keyword"]["order"], "desc");
    }

    #[test]
    fn test_predicates_are_must_clauses() {
        let body = search_body(&plan(vec![
            Predicate::equals("published", true),
            Predicate::any_of("categories", ["c1", "c2"]),
            Predicate::contains(["title", "description"], "star"),
        ]));

        let must = body["query"]["bool"]["must"].as_array().unwrap();
        assert_eq!(must.len(), 3);
        assert_eq!(must[0], json!({ "term": { "published": true } }));
        assert_eq!(must[1], json!({ "terms": { "categories": ["c1", "c2"] } }));
        assert_eq!(
            must[2],
            json!({
                "query_string": {
                    "fields": ["title", "description"],
                    "query": "*star*"
                }
            })
        );
    }

    #[test]
    fn test_escape_query_string() {
        assert_eq!(escape_query_string("plain"), "plain");
        assert_eq!(escape_query_string("a:b"), "a\\:b");
        assert_eq!(escape_query_string("star wars"), "star\\ wars");
        assert_eq!(escape_query_string("(x)*"), "\\(x\\)\\*");
    }
}
