use catalog_indexer_client::ClientError;
use catalog_indexer_repository::SearchIndexError;
use std::fmt;
use thiserror::Error;

use crate::codec::DecodeError;

/// How a handler failure is escalated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Goes straight to the dead-letter sink.
    Permanent,
    Transient,
    /// The dependency is saturated or known unhealthy.
    BackPressure,
}

impl FailureClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Permanent => "permanent",
            Self::Transient => "transient",
            Self::BackPressure => "back_pressure",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "permanent" => Some(Self::Permanent),
            "transient" => Some(Self::Transient),
            "back_pressure" => Some(Self::BackPressure),
            _ => None,
        }
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone)]
pub enum HandlerError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Enrichment error: {0}")]
    Enrichment(#[from] ClientError),

    #[error("Search index error: {0}")]
    Index(#[from] SearchIndexError),
}

impl HandlerError {
    pub fn class(&self) -> FailureClass {
        match self {
            Self::Decode(_) => FailureClass::Permanent,
            Self::Enrichment(err) if err.is_back_pressure() => FailureClass::BackPressure,
            Self::Enrichment(err) if err.is_transient() => FailureClass::Transient,
            Self::Enrichment(_) => FailureClass::Permanent,
            Self::Index(err) if err.is_validation() => FailureClass::Permanent,
            Self::Index(_) => FailureClass::Transient,
        }
    }
}
