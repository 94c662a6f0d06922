//! The entity kinds handled by the indexer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A catalog entity kind.
///
/// Each kind has its own CDC topic, enrichment endpoint and search index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Category,
    CastMember,
    Genre,
    Video,
}

impl EntityKind {
    /// All kinds, in wiring order.
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Category,
        EntityKind::CastMember,
        EntityKind::Genre,
        EntityKind::Video,
    ];

    /// Plural namespace used for index aliases, REST namespaces and log fields.
    pub fn namespace(&self) -> &'static str {
        match self {
            EntityKind::Category => "categories",
            EntityKind::CastMember => "cast_members",
            EntityKind::Genre => "genres",
            EntityKind::Video => "videos",
        }
    }

    /// Upper-case prefix for this kind's environment variables.
    pub fn env_prefix(&self) -> &'static str {
        match self {
            EntityKind::Category => "CATEGORIES",
            EntityKind::CastMember => "CAST_MEMBERS",
            EntityKind::Genre => "GENRES",
            EntityKind::Video => "VIDEOS",
        }
    }

    /// Name of the read-through cache in front of this kind's enrichment client.
    pub fn cache_name(&self) -> &'static str {
        match self {
            EntityKind::Category => "admin-categories",
            EntityKind::CastMember => "admin-cast-members",
            EntityKind::Genre => "admin-genres",
            EntityKind::Video => "admin-videos",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.namespace())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "category" | "categories" => Ok(EntityKind::Category),
            "cast_member" | "cast_members" => Ok(EntityKind::CastMember),
            "genre" | "genres" => Ok(EntityKind::Genre),
            "video" | "videos" => Ok(EntityKind::Video),
            other => Err(format!("unknown entity kind '{}'", other)),
        }
    }
}
