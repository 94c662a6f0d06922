//! Resilient enrichment client for the catalog indexer.
//!
//! A change event only says *which* entity changed. This crate fetches the
//! authoritative current state of that entity from the service that owns it.
//!
//! This crate provides:
//! - [`EntityClient`] trait consumed by the listeners
//! - [`ResilientClient`] the production client, wrapping a fetcher in a
//!   read-through cache, a bounded retry, a circuit breaker and a bulkhead
//! - [`EntityFetcher`] trait for the raw remote call, with [`HttpFetcher`]
//!   for REST services and [`MockFetcher`] for tests
//!
//! ## Policy order
//!
//! ```text
//! cache -> retry -> circuit breaker -> bulkhead -> HTTP GET /{id}
//! ```
//!
//! A cache hit never reaches the network. Only transient failures (timeouts,
//! 5xx, connection errors) are retried locally. `BulkheadFull` and
//! `CallNotPermitted` surface immediately so the caller can escalate.

pub mod client;
pub mod config;
pub mod errors;
pub mod fetcher;
pub mod resilience;
pub mod resource;

pub use client::{EntityClient, ResilientClient};
pub use config::{BulkheadConfig, CacheConfig, CircuitBreakerConfig, ClientConfig, RetryConfig};
pub use errors::ClientError;
pub use fetcher::{EntityFetcher, HttpFetcher, MockFetcher};
pub use resilience::{
    Bulkhead, CallOutcome, CallPermit, CircuitBreaker, CircuitState, RetryPolicy, TtlCache,
};
pub use resource::Resource;
