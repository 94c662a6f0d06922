//! Retry escalation: failed records move through delayed retry topics and
//! end in the dead-letter sink.
//!
//! ```text
//! topic -> topic-retry-0 -> topic-retry-1 -> ... -> topic-retry-(k-1) -> dead-letter
//! ```
//!
//! `k` is `max_attempts - 1`, so a record that keeps failing passes through a
//! handler exactly `max_attempts` times. Permanent failures skip the retry
//! topics.

mod escalator;
mod headers;
mod topology;

pub use escalator::{Escalation, RetryEscalator};
pub use headers::{
    RetryHeaders, ATTEMPT, DUE_AT_MS, EXCEPTION_CLASS, EXCEPTION_MESSAGE, ORIGINAL_OFFSET,
    ORIGINAL_PARTITION, ORIGINAL_TOPIC,
};
pub use topology::{dead_letter_topic, retry_topic, RetryTopology, Stage};
