//! Resilience policies wrapped around every enrichment lookup.

pub mod bulkhead;
pub mod cache;
pub mod circuit_breaker;
pub mod retry;

pub use bulkhead::Bulkhead;
pub use cache::TtlCache;
pub use circuit_breaker::{CallOutcome, CallPermit, CircuitBreaker, CircuitState};
pub use retry::RetryPolicy;
