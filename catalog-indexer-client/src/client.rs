use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::fetcher::{EntityFetcher, HttpFetcher};
use crate::resilience::{Bulkhead, CallOutcome, CircuitBreaker, CircuitState, RetryPolicy, TtlCache};
use crate::resource::Resource;

/// Resolves the current state of an entity by id.
#[async_trait]
pub trait EntityClient<E>: Send + Sync {
    /// `Ok(None)` when the owning service does not know the id.
    async fn fetch(&self, id: &str) -> Result<Option<E>, ClientError>;
}

/// Enrichment client with the full resilience stack:
/// cache, then retry, then circuit breaker, then bulkhead around the fetcher.
pub struct ResilientClient<E: Resource> {
    fetcher: Arc<dyn EntityFetcher<E>>,
    cache: TtlCache<E>,
    retry: RetryPolicy,
    breaker: CircuitBreaker,
    bulkhead: Bulkhead,
}

impl<E: Resource> ResilientClient<E> {
    pub fn new(fetcher: Arc<dyn EntityFetcher<E>>, config: &ClientConfig) -> Self {
        let namespace = E::KIND.namespace();
        Self {
            fetcher,
            cache: TtlCache::new(E::KIND.cache_name(), &config.cache),
            retry: RetryPolicy::new(&config.retry),
            breaker: CircuitBreaker::new(namespace, config.circuit_breaker.clone()),
            bulkhead: Bulkhead::new(namespace, &config.bulkhead),
        }
    }

    /// Client backed by [`HttpFetcher`] against `config.base_url`.
    pub fn http(config: &ClientConfig) -> Result<Self, ClientError> {
        let fetcher = HttpFetcher::<E>::new(config)?;
        Ok(Self::new(Arc::new(fetcher), config))
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    pub fn cache(&self) -> &TtlCache<E> {
        &self.cache
    }

    async fn guarded_fetch(&self, id: &str) -> Result<Option<E>, ClientError> {
        let call = self.breaker.try_acquire()?;

        // Dropping `call` unrecorded counts it as ignored.
        let _slot = self.bulkhead.try_acquire()?;

        let result = self.fetcher.fetch(id).await;
        call.record(CallOutcome::of(&result));

        if let Err(err) = &result {
            if err.is_transient() {
                debug!(error = %err, "Transient enrichment failure");
            }
        }
        result
    }
}

#[async_trait]
impl<E: Resource> EntityClient<E> for ResilientClient<E> {
    #[instrument(skip(self), fields(namespace = E::KIND.namespace()))]
    async fn fetch(&self, id: &str) -> Result<Option<E>, ClientError> {
        if let Some(entity) = self.cache.get(id) {
            debug!(cache = self.cache.name(), "Cache hit");
            return Ok(Some(entity));
        }

        let result = self.retry.run(|| self.guarded_fetch(id)).await;

        match &result {
            Ok(Some(entity)) => self.cache.insert(id, entity.clone()),
            Ok(None) => debug!("Resource not found"),
            Err(err) => warn!(error = %err, "Enrichment lookup failed"),
        }
        result
    }
}
