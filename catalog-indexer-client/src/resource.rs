//! Mapping between resolved entities and the wire shapes of their services.

use catalog_indexer_shared::{CastMember, Category, EntityKind, Genre, Video};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeSet;

/// An entity that can be resolved from its owning service by id.
pub trait Resource: Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    /// The JSON body returned by `GET {base_url}/{id}`.
    type Response: DeserializeOwned + Send;

    fn from_response(response: Self::Response) -> Self;
}

impl Resource for Category {
    const KIND: EntityKind = EntityKind::Category;
    type Response = Category;

    fn from_response(response: Self::Response) -> Self {
        response
    }
}

impl Resource for CastMember {
    const KIND: EntityKind = EntityKind::CastMember;
    type Response = CastMember;

    fn from_response(response: Self::Response) -> Self {
        response
    }
}

impl Resource for Genre {
    const KIND: EntityKind = EntityKind::Genre;
    type Response = Genre;

    fn from_response(response: Self::Response) -> Self {
        response
    }
}

impl Resource for Video {
    const KIND: EntityKind = EntityKind::Video;
    type Response = VideoResponse;

    fn from_response(response: Self::Response) -> Self {
        response.into()
    }
}

/// Encoded media (video, trailer).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaResource {
    #[serde(default)]
    pub encoded_location: Option<String>,
}

/// Image media (banner, thumbnails).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageResource {
    #[serde(default)]
    pub location: Option<String>,
}

/// Body of the videos service. Media come back as nested objects.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoResponse {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub year_launched: i32,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub opened: bool,
    #[serde(default)]
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub video: Option<MediaResource>,
    #[serde(default)]
    pub trailer: Option<MediaResource>,
    #[serde(default)]
    pub banner: Option<ImageResource>,
    #[serde(default)]
    pub thumbnail: Option<ImageResource>,
    #[serde(default)]
    pub thumbnail_half: Option<ImageResource>,
    #[serde(default)]
    pub categories_id: Option<BTreeSet<String>>,
    #[serde(default)]
    pub cast_members_id: Option<BTreeSet<String>>,
    #[serde(default)]
    pub genres_id: Option<BTreeSet<String>>,
}

fn encoded(media: Option<MediaResource>) -> String {
    media.and_then(|m| m.encoded_location).unwrap_or_default()
}

fn located(image: Option<ImageResource>) -> String {
    image.and_then(|i| i.location).unwrap_or_default()
}

impl From<VideoResponse> for Video {
    fn from(response: VideoResponse) -> Self {
        Self {
            id: response.id,
            title: response.title,
            description: response.description.unwrap_or_default(),
            year_launched: response.year_launched,
            duration: response.duration,
            rating: response.rating.unwrap_or_default(),
            opened: response.opened,
            published: response.published,
            created_at: response.created_at,
            updated_at: response.updated_at,
            video: encoded(response.video),
            trailer: encoded(response.trailer),
            banner: located(response.banner),
            thumbnail: located(response.thumbnail),
            thumbnail_half: located(response.thumbnail_half),
            categories_id: response.categories_id.unwrap_or_default(),
            cast_members_id: response.cast_members_id.unwrap_or_default(),
            genres_id: response.genres_id.unwrap_or_default(),
        }
    }
}
