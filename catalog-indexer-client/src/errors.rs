//! Error types for the enrichment client.

use thiserror::Error;

/// Errors returned by an enrichment lookup.
///
/// "Not found" is not an error: it is `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The request did not complete within the read timeout.
    #[error("Timeout observed from {namespace} [resourceId:{id}]")]
    Timeout { namespace: &'static str, id: String },

    /// The owning service answered with a 5xx status.
    #[error("Error observed from {namespace} [resourceId:{id}] [status:{status}]")]
    ServerError {
        namespace: &'static str,
        id: String,
        status: u16,
    },

    /// The owning service could not be reached.
    #[error("Failed to reach {namespace} [resourceId:{id}]: {message}")]
    Unavailable {
        namespace: &'static str,
        id: String,
        message: String,
    },

    /// No bulkhead permit was free.
    #[error("Bulkhead '{namespace}' is full and does not permit further calls")]
    BulkheadFull { namespace: &'static str },

    /// The circuit breaker is open.
    #[error("CircuitBreaker '{namespace}' is OPEN and does not permit further calls")]
    CallNotPermitted { namespace: &'static str },

    /// The owning service rejected our credentials.
    #[error("Unauthorized call to {namespace} [resourceId:{id}] [status:{status}]")]
    Unauthorized {
        namespace: &'static str,
        id: String,
        status: u16,
    },

    /// Any other non-success status.
    #[error("Unexpected response from {namespace} [resourceId:{id}] [status:{status}]")]
    UnexpectedStatus {
        namespace: &'static str,
        id: String,
        status: u16,
    },

    /// The body could not be decoded into the expected entity.
    #[error("Failed to decode {namespace} [resourceId:{id}]: {message}")]
    Decode {
        namespace: &'static str,
        id: String,
        message: String,
    },

    /// The request could not be built, e.g. an invalid id or base URL.
    #[error("Invalid request to {namespace}: {message}")]
    InvalidRequest {
        namespace: &'static str,
        message: String,
    },
}

impl ClientError {
    /// Remote failures that may go away on their own.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::ServerError { .. } | Self::Unavailable { .. }
        )
    }

    /// Rejections raised locally because the dependency is saturated or unhealthy.
    pub fn is_back_pressure(&self) -> bool {
        matches!(self, Self::BulkheadFull { .. } | Self::CallNotPermitted { .. })
    }

    /// Failures that will not change on retry.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient() && !self.is_back_pressure()
    }
}
