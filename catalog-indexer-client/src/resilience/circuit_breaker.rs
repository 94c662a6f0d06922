//! Count-based circuit breaker.
//!
//! The breaker keeps the outcomes of the last `sliding_window_size` calls.
//! Once at least `minimum_number_of_calls` have been recorded and the share
//! of failures reaches `failure_rate_threshold`, the circuit opens and every
//! call is rejected with `CallNotPermitted`. After
//! `wait_duration_in_open_state` it lets `permitted_calls_in_half_open_state`
//! trial calls through; their failure rate decides whether it closes again
//! or reopens.
//!
//! A granted call holds a [`CallPermit`]. Dropping the permit without
//! recording an outcome counts the call as ignored and releases its
//! half-open slot.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::CircuitBreakerConfig;
use crate::errors::ClientError;

/// Current state of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// How a call that passed the breaker ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Success,
    Failure,
    /// Counted neither way, e.g. a permanent error or a bulkhead rejection.
    Ignored,
}

impl CallOutcome {
    pub fn of<T>(result: &Result<T, ClientError>) -> Self {
        match result {
            Ok(_) => CallOutcome::Success,
            Err(err) if err.is_transient() => CallOutcome::Failure,
            Err(_) => CallOutcome::Ignored,
        }
    }
}

struct Inner {
    state: CircuitState,
    /// `true` marks a failed call.
    window: VecDeque<bool>,
    opened_at: Option<Instant>,
    half_open_admitted: usize,
    half_open_results: Vec<bool>,
    /// Bumped on every transition to half-open.
    half_open_generation: u64,
}

/// Permission for one call through the breaker.
#[must_use = "a dropped permit is recorded as an ignored call"]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    /// Set when the call was admitted as a half-open trial.
    trial_of: Option<u64>,
    recorded: bool,
}

impl CallPermit<'_> {
    pub fn record(mut self, outcome: CallOutcome) {
        self.recorded = true;
        self.breaker.on_result(self.trial_of, outcome);
    }
}

impl fmt::Debug for CallPermit<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallPermit")
            .field("circuit_breaker", &self.breaker.namespace)
            .field("trial_of", &self.trial_of)
            .finish()
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.recorded {
            self.breaker.on_result(self.trial_of, CallOutcome::Ignored);
        }
    }
}

pub struct CircuitBreaker {
    namespace: &'static str,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
    rejected: AtomicU64,
}

impl CircuitBreaker {
    pub fn new(namespace: &'static str, config: CircuitBreakerConfig) -> Self {
        let config = config.normalized();
        Self {
            namespace,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                window: VecDeque::with_capacity(config.sliding_window_size),
                opened_at: None,
                half_open_admitted: 0,
                half_open_results: Vec::new(),
                half_open_generation: 0,
            }),
            config,
            rejected: AtomicU64::new(0),
        }
    }

    /// Asks permission for one call.
    pub fn try_acquire(&self) -> Result<CallPermit<'_>, ClientError> {
        let mut inner = self.lock();

        if inner.state == CircuitState::Open {
            let waited = inner
                .opened_at
                .map(|at| at.elapsed() >= self.config.wait_duration_in_open_state)
                .unwrap_or(true);
            if waited {
                info!(circuit_breaker = self.namespace, "Circuit breaker half-open");
                inner.state = CircuitState::HalfOpen;
                inner.half_open_admitted = 0;
                inner.half_open_results.clear();
                inner.half_open_generation += 1;
            }
        }

        match inner.state {
            CircuitState::Closed => Ok(CallPermit {
                breaker: self,
                trial_of: None,
                recorded: false,
            }),
            CircuitState::HalfOpen
                if inner.half_open_admitted < self.config.permitted_calls_in_half_open_state =>
            {
                inner.half_open_admitted += 1;
                Ok(CallPermit {
                    breaker: self,
                    trial_of: Some(inner.half_open_generation),
                    recorded: false,
                })
            }
            _ => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                Err(ClientError::CallNotPermitted {
                    namespace: self.namespace,
                })
            }
        }
    }

    fn on_result(&self, trial_of: Option<u64>, outcome: CallOutcome) {
        let mut inner = self.lock();

        match inner.state {
            CircuitState::Closed => {
                let failed = match outcome {
                    CallOutcome::Success => false,
                    CallOutcome::Failure => true,
                    CallOutcome::Ignored => return,
                };
                while inner.window.len() >= self.config.sliding_window_size {
                    inner.window.pop_front();
                }
                inner.window.push_back(failed);

                if inner.window.len() >= self.config.minimum_number_of_calls {
                    let rate = failure_rate(inner.window.iter().copied());
                    if rate >= self.config.failure_rate_threshold {
                        self.open(&mut inner, rate);
                    }
                }
            }
            // Only trials of the current half-open round count.
            CircuitState::HalfOpen if trial_of != Some(inner.half_open_generation) => {}
            CircuitState::HalfOpen => {
                match outcome {
                    CallOutcome::Success => inner.half_open_results.push(false),
                    CallOutcome::Failure => inner.half_open_results.push(true),
                    CallOutcome::Ignored => {
                        inner.half_open_admitted = inner.half_open_admitted.saturating_sub(1);
                        return;
                    }
                }

                if inner.half_open_results.len() >= self.config.permitted_calls_in_half_open_state {
                    let rate = failure_rate(inner.half_open_results.iter().copied());
                    if rate >= self.config.failure_rate_threshold {
                        self.open(&mut inner, rate);
                    } else {
                        info!(circuit_breaker = self.namespace, "Circuit breaker closed");
                        inner.state = CircuitState::Closed;
                        inner.window.clear();
                        inner.opened_at = None;
                    }
                }
            }
            // Late results of calls admitted before the circuit opened.
            CircuitState::Open => {}
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Calls rejected while open or while the half-open quota was used up.
    pub fn rejected_calls(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    fn open(&self, inner: &mut Inner, rate: f64) {
        warn!(
            circuit_breaker = self.namespace,
            failure_rate = rate,
            "Circuit breaker opened"
        );
        inner.state = CircuitState::Open;
        inner.opened_at = Some(Instant::now());
        inner.window.clear();
        inner.half_open_admitted = 0;
        inner.half_open_results.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn failure_rate(outcomes: impl Iterator<Item = bool>) -> f64 {
    let (total, failed) = outcomes.fold((0usize, 0usize), |(total, failed), f| {
        (total + 1, failed + usize::from(f))
    });
    if total == 0 {
        0.0
    } else {
        failed as f64 * 100.0 / total as f64
    }
}
