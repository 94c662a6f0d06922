//! Bounded local retry of transient failures.

use std::future::Future;
use std::time::Duration;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::RetryIf;

use crate::config::RetryConfig;
use crate::errors::ClientError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: usize,
    wait: Duration,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            wait: config.wait,
        }
    }

    /// Runs `action` until it succeeds, fails with a non-transient error or
    /// `max_attempts` calls have been made.
    pub async fn run<T, F, Fut>(&self, action: F) -> Result<T, ClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let strategy = FixedInterval::new(self.wait).take(self.max_attempts - 1);
        RetryIf::spawn(strategy, action, |err: &ClientError| err.is_transient()).await
    }
}
