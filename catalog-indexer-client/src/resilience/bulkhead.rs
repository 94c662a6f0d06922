//! Semaphore bulkhead limiting concurrent calls to one dependency.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::BulkheadConfig;
use crate::errors::ClientError;

/// Non-blocking bulkhead: when every permit is taken the call is rejected
/// instead of queued.
pub struct Bulkhead {
    namespace: &'static str,
    permits: Arc<Semaphore>,
}

impl Bulkhead {
    pub fn new(namespace: &'static str, config: &BulkheadConfig) -> Self {
        Self {
            namespace,
            permits: Arc::new(Semaphore::new(config.max_concurrent_calls.max(1))),
        }
    }

    /// The call holds its slot until the returned permit is dropped.
    pub fn try_acquire(&self) -> Result<OwnedSemaphorePermit, ClientError> {
        self.permits
            .clone()
            .try_acquire_owned()
            .map_err(|_| ClientError::BulkheadFull {
                namespace: self.namespace,
            })
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}
