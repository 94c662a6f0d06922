//! Integration tests for the search index gateway.
//!
//! These run the real gateway and query planner against the in-memory
//! provider, which evaluates the same query plans the OpenSearch backend
//! receives.

use std::collections::BTreeSet;
use std::sync::Arc;

use catalog_indexer_repository::{InMemoryProvider, SearchIndexGateway, SearchIndexProvider};
use catalog_indexer_shared::{
    CategoryDocument, EntityKind, GenreDocument, SearchQuery, SortDirection, VideoDocument,
};
use chrono::{TimeZone, Utc};
use uuid::Uuid;

fn category(id: &str, name: &str, description: &str) -> CategoryDocument {
    CategoryDocument {
        id: id.to_string(),
        name: name.to_string(),
        description: Some(description.to_string()),
        active: true,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        deleted_at: None,
    }
}

fn genre(id: &str, name: &str, categories: &[&str]) -> GenreDocument {
    GenreDocument {
        id: id.to_string(),
        name: name.to_string(),
        active: true,
        categories: categories.iter().map(|c| c.to_string()).collect(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
        deleted_at: None,
    }
}

fn video(title: &str, published: bool, year: i32, categories: &[&str]) -> VideoDocument {
    VideoDocument {
        id: Uuid::new_v4().simple().to_string(),
        title: title.to_string(),
        description: format!("{} description", title),
        launched_at: year,
        duration: 90.0,
        rating: "L".to_string(),
        opened: false,
        published,
        video: String::new(),
        trailer: String::new(),
        banner: String::new(),
        thumbnail: String::new(),
        thumbnail_half: String::new(),
        categories: categories.iter().map(|c| c.to_string()).collect(),
        cast_members: BTreeSet::new(),
        genres: BTreeSet::new(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn gateways() -> (
    Arc<InMemoryProvider>,
    SearchIndexGateway<CategoryDocument>,
    SearchIndexGateway<GenreDocument>,
    SearchIndexGateway<VideoDocument>,
) {
    let provider = Arc::new(InMemoryProvider::new());
    (
        provider.clone(),
        SearchIndexGateway::new(provider.clone()),
        SearchIndexGateway::new(provider.clone()),
        SearchIndexGateway::new(provider),
    )
}

#[tokio::test]
async fn test_upsert_twice_yields_one_identical_document() {
    let (provider, categories, _, _) = gateways();
    let doc = category("c1", "Movies", "Feature films");

    categories.upsert(&doc).await.unwrap();
    categories.upsert(&doc).await.unwrap();

    assert_eq!(provider.len(EntityKind::Category), 1);
    assert_eq!(categories.find_by_id("c1").await.unwrap(), Some(doc));
}

#[tokio::test]
async fn test_upsert_replaces_without_merging() {
    let (_, categories, _, _) = gateways();
    categories
        .upsert(&category("c1", "Movies", "Feature films"))
        .await
        .unwrap();

    let mut replacement = category("c1", "Series", "");
    replacement.description = None;
    categories.upsert(&replacement).await.unwrap();

    let stored = categories.find_by_id("c1").await.unwrap().unwrap();
    assert_eq!(stored.name, "Series");
    assert!(stored.description.is_none());
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let (provider, categories, _, _) = gateways();
    categories
        .upsert(&category("c1", "Movies", "Feature films"))
        .await
        .unwrap();

    categories.delete_by_id("c1").await.unwrap();
    categories.delete_by_id("c1").await.unwrap();
    categories.delete_by_id("never-existed").await.unwrap();

    assert!(provider.is_empty(EntityKind::Category));
    assert!(categories.find_by_id("c1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_kinds_do_not_share_documents() {
    let (_, categories, genres, _) = gateways();
    categories
        .upsert(&category("same-id", "Movies", ""))
        .await
        .unwrap();

    assert!(genres.find_by_id("same-id").await.unwrap().is_none());
}

#[tokio::test]
async fn test_pagination_keeps_total() {
    let (_, categories, _, _) = gateways();
    for (id, name) in [("a", "Action"), ("b", "Biography"), ("c", "Comedy")] {
        categories.upsert(&category(id, name, "")).await.unwrap();
    }

    for page in 0..3 {
        let result = categories.find_all(&SearchQuery::new(page, 1)).await.unwrap();
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.total, 3);
        assert_eq!(result.current_page, page);
        assert_eq!(result.per_page, 1);
    }

    let past_end = categories.find_all(&SearchQuery::new(3, 1)).await.unwrap();
    assert!(past_end.items.is_empty());
    assert_eq!(past_end.total, 3);
}

#[tokio::test]
async fn test_sort_by_name_is_byte_exact() {
    let (_, categories, _, _) = gateways();
    for (id, name) in [("1", "documentaries"), ("2", "Drama"), ("3", "Action Movies")] {
        categories.upsert(&category(id, name, "")).await.unwrap();
    }

    let asc = categories.find_all(&SearchQuery::new(0, 10)).await.unwrap();
    let names: Vec<_> = asc.items.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Action Movies", "Drama", "documentaries"]);

    let desc = categories
        .find_all(&SearchQuery::new(0, 10).sorted_by("name", SortDirection::Desc))
        .await
        .unwrap();
    let names: Vec<_> = desc.items.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["documentaries", "Drama", "Action Movies"]);
}

#[tokio::test]
async fn test_category_terms_match_name_or_description() {
    let (_, categories, _, _) = gateways();
    categories.upsert(&category("1", "Movies", "Long feature films")).await.unwrap();
    categories.upsert(&category("2", "Features", "Short clips")).await.unwrap();
    categories.upsert(&category("3", "Series", "Episodes")).await.unwrap();

    let result = categories
        .find_all(&SearchQuery::new(0, 10).with_terms("feature"))
        .await
        .unwrap();

    let ids: Vec<_> = result.items.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["2", "1"]);
    assert_eq!(result.total, 2);
}

#[tokio::test]
async fn test_genre_category_filter_is_or_within_field() {
    let (_, _, genres, _) = gateways();
    genres.upsert(&genre("A", "Action", &["c1"])).await.unwrap();
    genres.upsert(&genre("B", "Biography", &["c2"])).await.unwrap();
    genres.upsert(&genre("C", "Comedy", &["c2", "c3"])).await.unwrap();

    let only_c1 = genres
        .find_all(&SearchQuery::new(0, 10).with_categories(["c1"]))
        .await
        .unwrap();
    assert_eq!(only_c1.items.len(), 1);
    assert_eq!(only_c1.items[0].id, "A");

    let c1_or_c3 = genres
        .find_all(&SearchQuery::new(0, 10).with_categories(["c1", "c3"]))
        .await
        .unwrap();
    let ids: Vec<_> = c1_or_c3.items.iter().map(|g| g.id.as_str()).collect();
    assert_eq!(ids, vec!["A", "C"]);

    let and_terms = genres
        .find_all(
            &SearchQuery::new(0, 10)
                .with_categories(["c2"])
                .with_terms("bio"),
        )
        .await
        .unwrap();
    assert_eq!(and_terms.total, 1);
    assert_eq!(and_terms.items[0].id, "B");
}

#[tokio::test]
async fn test_videos_are_restricted_to_published() {
    let (_, _, _, videos) = gateways();
    videos.upsert(&video("Alien", true, 1979, &["c1"])).await.unwrap();
    videos.upsert(&video("Blade Runner", false, 1982, &["c1"])).await.unwrap();
    videos.upsert(&video("Cube", true, 1997, &["c2"])).await.unwrap();

    let all = videos
        .find_all(&SearchQuery::new(0, 10).sorted_by("title", SortDirection::Asc))
        .await
        .unwrap();
    let titles: Vec<_> = all.items.iter().map(|v| v.title.as_str()).collect();
    assert_eq!(titles, vec!["Alien", "Cube"]);
    assert_eq!(all.total, 2);

    let filtered = videos
        .find_all(
            &SearchQuery::new(0, 10)
                .sorted_by("title", SortDirection::Asc)
                .with_categories(["c1"])
                .launched_in(1979),
        )
        .await
        .unwrap();
    assert_eq!(filtered.total, 1);
    assert_eq!(filtered.items[0].title, "Alien");

    let by_description = videos
        .find_all(
            &SearchQuery::new(0, 10)
                .sorted_by("title", SortDirection::Asc)
                .with_terms("cube desc"),
        )
        .await
        .unwrap();
    assert_eq!(by_description.total, 1);
}

#[tokio::test]
async fn test_find_all_by_id_skips_missing() {
    let (_, categories, _, _) = gateways();
    categories.upsert(&category("a", "Action", "")).await.unwrap();
    categories.upsert(&category("b", "Biography", "")).await.unwrap();

    let ids: BTreeSet<String> = ["a", "b", "zz"].iter().map(|s| s.to_string()).collect();
    let found = categories.find_all_by_id(&ids).await.unwrap();

    let mut found_ids: Vec<_> = found.iter().map(|c| c.id.clone()).collect();
    found_ids.sort();
    assert_eq!(found_ids, vec!["a".to_string(), "b".to_string()]);
}

#[tokio::test]
async fn test_ensure_index_exists_is_repeatable() {
    let provider = InMemoryProvider::new();
    for kind in EntityKind::ALL {
        provider.ensure_index_exists(kind).await.unwrap();
        provider.ensure_index_exists(kind).await.unwrap();
        assert!(provider.is_empty(kind));
    }
}
