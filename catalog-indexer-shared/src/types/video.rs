//! Video entity and its search document.
//!
//! The videos service nests media resources in objects. By the time a
//! [`Video`] exists those have been flattened to plain URLs, with an empty
//! string standing in for any media that has not been uploaded yet.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::types::serde_ext::{set_or_empty, string_or_empty};
use crate::types::{EntityKind, SearchDocument};

/// A video as resolved from the videos service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub title: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub description: String,
    pub year_launched: i32,
    #[serde(default)]
    pub duration: f64,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub rating: String,
    #[serde(default)]
    pub opened: bool,
    #[serde(default)]
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub video: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub trailer: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub banner: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub thumbnail: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub thumbnail_half: String,
    #[serde(default, deserialize_with = "set_or_empty")]
    pub categories_id: BTreeSet<String>,
    #[serde(default, deserialize_with = "set_or_empty")]
    pub cast_members_id: BTreeSet<String>,
    #[serde(default, deserialize_with = "set_or_empty")]
    pub genres_id: BTreeSet<String>,
}

/// Video as stored in the `videos` index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoDocument {
    pub id: String,
    pub title: String,
    pub description: String,
    pub launched_at: i32,
    pub duration: f64,
    pub rating: String,
    pub opened: bool,
    pub published: bool,
    pub video: String,
    pub trailer: String,
    pub banner: String,
    pub thumbnail: String,
    pub thumbnail_half: String,
    #[serde(default, deserialize_with = "set_or_empty")]
    pub categories: BTreeSet<String>,
    #[serde(default, deserialize_with = "set_or_empty")]
    pub cast_members: BTreeSet<String>,
    #[serde(default, deserialize_with = "set_or_empty")]
    pub genres: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SearchDocument for VideoDocument {
    const KIND: EntityKind = EntityKind::Video;

    fn id(&self) -> &str {
        &self.id
    }
}

impl From<Video> for VideoDocument {
    fn from(video: Video) -> Self {
        Self {
            id: video.id,
            title: video.title,
            description: video.description,
            launched_at: video.year_launched,
            duration: video.duration,
            rating: video.rating,
            opened: video.opened,
            published: video.published,
            video: video.video,
            trailer: video.trailer,
            banner: video.banner,
            thumbnail: video.thumbnail,
            thumbnail_half: video.thumbnail_half,
            categories: video.categories_id,
            cast_members: video.cast_members_id,
            genres: video.genres_id,
            created_at: video.created_at,
            updated_at: video.updated_at,
        }
    }
}

impl From<VideoDocument> for Video {
    fn from(doc: VideoDocument) -> Self {
        Self {
            id: doc.id,
            title: doc.title,
            description: doc.description,
            year_launched: doc.launched_at,
            duration: doc.duration,
            rating: doc.rating,
            opened: doc.opened,
            published: doc.published,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
            video: doc.video,
            trailer: doc.trailer,
            banner: doc.banner,
            thumbnail: doc.thumbnail,
            thumbnail_half: doc.thumbnail_half,
            categories_id: doc.categories,
            cast_members_id: doc.cast_members,
            genres_id: doc.genres,
        }
    }
}
