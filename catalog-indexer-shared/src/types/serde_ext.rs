//! Lenient deserializers for fields the owning services may send as `null`.

use serde::{Deserialize, Deserializer};
use std::collections::BTreeSet;

/// `null` or absent activity flags mean the entity is active.
pub(crate) fn active_or_default<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(true))
}

pub(crate) fn default_active() -> bool {
    true
}

/// `null` foreign-id sets become empty sets.
pub(crate) fn set_or_empty<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BTreeSet<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// `null` strings become empty strings.
pub(crate) fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
