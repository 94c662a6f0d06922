//! Raw lookups against the owning services.

mod http;
mod mock;

pub use http::HttpFetcher;
pub use mock::MockFetcher;

use async_trait::async_trait;

use crate::errors::ClientError;

/// Fetches one entity by id, without any resilience policy.
///
/// `Ok(None)` means the owning service does not know the id.
#[async_trait]
pub trait EntityFetcher<E>: Send + Sync {
    async fn fetch(&self, id: &str) -> Result<Option<E>, ClientError>;
}
