//! Cast member entity and its search document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::types::{EntityKind, SearchDocument};

/// The role a cast member plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CastMemberType {
    Actor,
    Director,
    #[default]
    Unknown,
}

impl CastMemberType {
    /// Parse a type name, case-insensitively. Anything unrecognised is `Unknown`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "ACTOR" => Self::Actor,
            "DIRECTOR" => Self::Director,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Actor => "ACTOR",
            Self::Director => "DIRECTOR",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for CastMemberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CastMemberType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Self::parse).unwrap_or_default())
    }
}

/// A cast member as resolved from the cast members service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastMember {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub member_type: CastMemberType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Cast member as stored in the `cast_members` index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastMemberDocument {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub member_type: CastMemberType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SearchDocument for CastMemberDocument {
    const KIND: EntityKind = EntityKind::CastMember;

    fn id(&self) -> &str {
        &self.id
    }
}

impl From<CastMember> for CastMemberDocument {
    fn from(member: CastMember) -> Self {
        Self {
            id: member.id,
            name: member.name,
            member_type: member.member_type,
            created_at: member.created_at,
            updated_at: member.updated_at,
        }
    }
}

impl From<CastMemberDocument> for CastMember {
    fn from(doc: CastMemberDocument) -> Self {
        Self {
            id: doc.id,
            name: doc.name,
            member_type: doc.member_type,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}
