//! Configuration for the enrichment client and its resilience policies.
//!
//! Values are plain data; reading them from the environment is the job of
//! the indexer binary.

use std::time::Duration;

pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Settings for one entity kind's client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Collection URL; entities are fetched from `{base_url}/{id}`.
    pub base_url: String,
    pub read_timeout: Duration,
    pub connect_timeout: Duration,
    /// Sent as `Authorization: Bearer <token>` when present.
    pub bearer_token: Option<String>,
    pub cache: CacheConfig,
    pub retry: RetryConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub bulkhead: BulkheadConfig,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            read_timeout: DEFAULT_READ_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            bearer_token: None,
            cache: CacheConfig::default(),
            retry: RetryConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            bulkhead: BulkheadConfig::default(),
        }
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_circuit_breaker(mut self, circuit_breaker: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = circuit_breaker;
        self
    }

    pub fn with_bulkhead(mut self, bulkhead: BulkheadConfig) -> Self {
        self.bulkhead = bulkhead;
        self
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 200,
            ttl: Duration::from_secs(60),
        }
    }
}

/// Local retry of transient failures. `max_attempts` includes the first call.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub wait: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            wait: Duration::from_millis(100),
        }
    }
}

/// Count-based sliding window circuit breaker.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub sliding_window_size: usize,
    pub minimum_number_of_calls: usize,
    /// Percentage of failed calls in the window that opens the circuit.
    pub failure_rate_threshold: f64,
    pub wait_duration_in_open_state: Duration,
    pub permitted_calls_in_half_open_state: usize,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            sliding_window_size: 10,
            minimum_number_of_calls: 5,
            failure_rate_threshold: 50.0,
            wait_duration_in_open_state: Duration::from_secs(10),
            permitted_calls_in_half_open_state: 3,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn with_sliding_window_size(mut self, size: usize) -> Self {
        self.sliding_window_size = size.max(1);
        self
    }

    pub fn with_minimum_number_of_calls(mut self, calls: usize) -> Self {
        self.minimum_number_of_calls = calls.max(1);
        self
    }

    pub fn with_failure_rate_threshold(mut self, percent: f64) -> Self {
        self.failure_rate_threshold = percent.clamp(0.0, 100.0);
        self
    }

    pub fn with_wait_duration_in_open_state(mut self, wait: Duration) -> Self {
        self.wait_duration_in_open_state = wait;
        self
    }

    pub fn with_permitted_calls_in_half_open_state(mut self, calls: usize) -> Self {
        self.permitted_calls_in_half_open_state = calls.max(1);
        self
    }

    /// Sizes are at least one and the minimum number of calls never exceeds
    /// the window.
    pub fn normalized(mut self) -> Self {
        self.sliding_window_size = self.sliding_window_size.max(1);
        self.minimum_number_of_calls = self
            .minimum_number_of_calls
            .clamp(1, self.sliding_window_size);
        self.permitted_calls_in_half_open_state = self.permitted_calls_in_half_open_state.max(1);
        self.failure_rate_threshold = self.failure_rate_threshold.clamp(0.0, 100.0);
        self
    }
}

#[derive(Debug, Clone)]
pub struct BulkheadConfig {
    pub max_concurrent_calls: usize,
}

impl Default for BulkheadConfig {
    fn default() -> Self {
        Self {
            max_concurrent_calls: 25,
        }
    }
}
