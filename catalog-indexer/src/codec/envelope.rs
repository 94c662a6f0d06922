//! Debezium change envelope.
//!
//! Messages look like
//!
//! ```json
//! { "payload": { "before": {...}, "after": {...}, "source": {...}, "op": "u" } }
//! ```
//!
//! Unknown fields are ignored at every level. Only the entity id is read
//! from the before/after images; the rest is kept as raw JSON.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Errors raised while decoding a raw message. All of them are permanent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Malformed change message: {0}")]
    Malformed(String),

    #[error("Change message has no operation")]
    MissingOperation,

    #[error("Unknown change operation '{0}'")]
    UnknownOperation(String),

    #[error("Change message for operation {operation} has no {image} image")]
    MissingImage {
        operation: Operation,
        image: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
    /// Row emitted by an initial snapshot.
    Snapshot,
}

impl Operation {
    pub fn from_code(code: &str) -> Result<Self, DecodeError> {
        match code {
            "c" => Ok(Self::Create),
            "u" => Ok(Self::Update),
            "d" => Ok(Self::Delete),
            "r" => Ok(Self::Snapshot),
            other => Err(DecodeError::UnknownOperation(other.to_string())),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Create => "c",
            Self::Update => "u",
            Self::Delete => "d",
            Self::Snapshot => "r",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Snapshot => "snapshot",
        };
        f.write_str(name)
    }
}

/// Row image carried by the envelope. Only a pointer to the entity.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntitySnapshot {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Where the change happened.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SourceMetadata {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub connector: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub db: Option<String>,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub ts_ms: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEnvelope {
    pub before: Option<EntitySnapshot>,
    pub after: Option<EntitySnapshot>,
    pub source: SourceMetadata,
    pub operation: Operation,
}

impl ChangeEnvelope {
    /// Id of the entity the change applies to: `before.id` for deletes,
    /// `after.id` otherwise. Always present on a decoded envelope.
    pub fn entity_id(&self) -> &str {
        let image = match self.operation {
            Operation::Delete => self.before.as_ref(),
            _ => self.after.as_ref(),
        };
        image.map(|snapshot| snapshot.id.as_str()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// Heartbeat or tombstone. Acknowledge and move on.
    Ignorable,
    Change(ChangeEnvelope),
}

#[derive(Deserialize)]
struct RawMessage {
    #[serde(default)]
    payload: Option<RawPayload>,
}

#[derive(Deserialize)]
struct RawPayload {
    #[serde(default)]
    before: Option<EntitySnapshot>,
    #[serde(default)]
    after: Option<EntitySnapshot>,
    #[serde(default)]
    source: Option<SourceMetadata>,
    #[serde(default)]
    op: Option<String>,
}

/// Decodes a raw record value.
pub fn decode(raw: Option<&[u8]>) -> Result<Decoded, DecodeError> {
    let bytes = match raw {
        Some(bytes) if !bytes.iter().all(u8::is_ascii_whitespace) => bytes,
        _ => return Ok(Decoded::Ignorable),
    };

    let message: Option<RawMessage> =
        serde_json::from_slice(bytes).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let payload = match message.and_then(|m| m.payload) {
        Some(payload) => payload,
        None => return Ok(Decoded::Ignorable),
    };

    if payload.before.is_none() && payload.after.is_none() {
        return Ok(Decoded::Ignorable);
    }

    let code = payload.op.ok_or(DecodeError::MissingOperation)?;
    let operation = Operation::from_code(&code)?;

    match operation {
        Operation::Delete if payload.before.is_none() => {
            return Err(DecodeError::MissingImage {
                operation,
                image: "before",
            })
        }
        Operation::Create | Operation::Update | Operation::Snapshot if payload.after.is_none() => {
            return Err(DecodeError::MissingImage {
                operation,
                image: "after",
            })
        }
        _ => {}
    }

    Ok(Decoded::Change(ChangeEnvelope {
        before: payload.before,
        after: payload.after,
        source: payload.source.unwrap_or_default(),
        operation,
    }))
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(id) if !id.is_empty() => Ok(id),
        Value::Number(id) => Ok(id.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a non-empty string or number id, got {}",
            other
        ))),
    }
}
