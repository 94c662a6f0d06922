use catalog_indexer_shared::{EntityKind, SearchQuery};
use serde_json::Value;

use crate::errors::SearchIndexError;
use crate::query::plan::{Predicate, QueryPlan, SortSpec, KEYWORD_SUFFIX};

/// Searchable layout of one index.
struct IndexSchema {
    /// Fields matched against free-text terms.
    text_fields: &'static [&'static str],
    /// Display fields that must be sorted through their keyword variant.
    keyword_sort_fields: &'static [&'static str],
}

fn schema(kind: EntityKind) -> IndexSchema {
    match kind {
        EntityKind::Category => IndexSchema {
            text_fields: &["name", "description"],
            keyword_sort_fields: &["name"],
        },
        EntityKind::CastMember | EntityKind::Genre => IndexSchema {
            text_fields: &["name"],
            keyword_sort_fields: &["name"],
        },
        EntityKind::Video => IndexSchema {
            text_fields: &["title", "description"],
            keyword_sort_fields: &["title"],
        },
    }
}

/// Translate a search query into a query plan for the index of `kind`.
///
/// # Errors
///
/// Returns `SearchIndexError::ValidationError` when the query is invalid.
pub fn plan_query(kind: EntityKind, query: &SearchQuery) -> Result<QueryPlan, SearchIndexError> {
    query.validate().map_err(SearchIndexError::validation)?;

    let schema = schema(kind);
    let filters = &query.filters;
    let mut must = Vec::new();

    if kind == EntityKind::Video {
        must.push(Predicate::equals("published", true));

        for (field, values) in [
            ("cast_members", &filters.cast_members),
            ("categories", &filters.categories),
            ("genres", &filters.genres),
        ] {
            if !values.is_empty() {
                must.push(Predicate::any_of(field, values.iter().cloned()));
            }
        }

        if let Some(year) = filters.launched_at {
            must.push(Predicate::equals("launched_at", year));
        }

        if let Some(rating) = filters.rating.as_deref().map(str::trim) {
            if !rating.is_empty() {
                must.push(Predicate::equals("rating", Value::from(rating)));
            }
        }
    }

    if let Some(terms) = query.terms() {
        must.push(Predicate::contains(schema.text_fields.iter().copied(), terms));
    }

    if kind == EntityKind::Genre && !filters.categories.is_empty() {
        must.push(Predicate::any_of(
            "categories",
            filters.categories.iter().cloned(),
        ));
    }

    Ok(QueryPlan {
        must,
        sort: SortSpec::new(sort_field(&schema, &query.sort), query.direction),
        from: query.offset(),
        size: query.per_page,
    })
}

fn sort_field(schema: &IndexSchema, requested: &str) -> String {
    let requested = requested.trim();
    match schema
        .keyword_sort_fields
        .iter()
        .find(|field| field.eq_ignore_ascii_case(requested))
    {
        Some(field) => format!("{}{}", field, KEYWORD_SUFFIX),
        None => requested.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_indexer_shared::SortDirection;

    #[test]
    fn test_category_terms_match_name_or_description() {
        let query = SearchQuery::new(0, 10).with_terms("doc");
        let plan = plan_query(EntityKind::Category, &query).unwrap();

        assert_eq!(plan.must, vec![Predicate::contains(["name", "description"], "doc")]);
        assert_eq!(plan.sort.field, "name.keyword");
    }

    #[test]
    fn test_blank_terms_match_all() {
        let query = SearchQuery::new(0, 10).with_terms("  ");
        let plan = plan_query(EntityKind::CastMember, &query).unwrap();
        assert!(plan.matches_all());
    }

    #[test]
    fn test_non_display_sort_is_used_as_is() {
        let query = SearchQuery::new(1, 5).sorted_by("created_at", SortDirection::Desc);
        let plan = plan_query(EntityKind::Genre, &query).unwrap();

        assert_eq!(plan.sort, SortSpec::new("created_at", SortDirection::Desc));
        assert_eq!(plan.from, 5);
        assert_eq!(plan.size, 5);
    }

    #[test]
    fn test_genre_filters_by_categories_and_terms() {
        let query = SearchQuery::new(0, 10)
            .with_terms("act")
            .with_categories(["c1", "c2"]);
        let plan = plan_query(EntityKind::Genre, &query).unwrap();

        assert_eq!(
            plan.must,
            vec![
                Predicate::contains(["name"], "act"),
                Predicate::any_of("categories", ["c1", "c2"]),
            ]
        );
    }

    #[test]
    fn test_category_ignores_foreign_filters() {
        let query = SearchQuery::new(0, 10).with_genres(["g1"]).launched_in(2020);
        let plan = plan_query(EntityKind::Category, &query).unwrap();
        assert!(plan.matches_all());
    }

    #[test]
    fn test_video_always_restricted_to_published() {
        let query = SearchQuery::new(0, 10).sorted_by("TITLE", SortDirection::Asc);
        let plan = plan_query(EntityKind::Video, &query).unwrap();

        assert_eq!(plan.must, vec![Predicate::equals("published", true)]);
        assert_eq!(plan.sort.field, "title.keyword");
    }

    #[test]
    fn test_video_full_filter_set() {
        let query = SearchQuery::new(0, 10)
            .with_terms("space")
            .with_cast_members(["m1"])
            .with_categories(["c1"])
            .with_genres(["g1", "g2"])
            .launched_in(1999)
            .with_rating("L");
        let plan = plan_query(EntityKind::Video, &query).unwrap();

        assert_eq!(
            plan.must,
            vec![
                Predicate::equals("published", true),
                Predicate::any_of("cast_members", ["m1"]),
                Predicate::any_of("categories", ["c1"]),
                Predicate::any_of("genres", ["g1", "g2"]),
                Predicate::equals("launched_at", 1999),
                Predicate::equals("rating", "L"),
                Predicate::contains(["title", "description"], "space"),
            ]
        );
    }

    #[test]
    fn test_blank_rating_is_ignored() {
        let query = SearchQuery::new(0, 10).with_rating(" ");
        let plan = plan_query(EntityKind::Video, &query).unwrap();
        assert_eq!(plan.must.len(), 1);
    }

    #[test]
    fn test_zero_page_size_is_rejected() {
        let query = SearchQuery::new(0, 0);
        let result = plan_query(EntityKind::Category, &query);
        assert!(matches!(result, Err(SearchIndexError::ValidationError(_))));
    }
}
