use std::fmt;
use std::time::Duration;

/// Where in the escalation chain a listener sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Main,
    Retry(usize),
}

impl Stage {
    /// 1-based attempt number of a record handled at this stage.
    pub fn attempt(&self) -> usize {
        match self {
            Self::Main => 1,
            Self::Retry(index) => index + 2,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Main => f.write_str("main"),
            Self::Retry(index) => write!(f, "retry-{}", index),
        }
    }
}

pub fn retry_topic(topic: &str, index: usize) -> String {
    format!("{}-retry-{}", topic, index)
}

pub fn dead_letter_topic(topic: &str) -> String {
    format!("{}-dlt", topic)
}

/// Retry stages and backoff of one listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryTopology {
    max_attempts: usize,
    base_delay: Duration,
    multiplier: u32,
}

impl Default for RetryTopology {
    fn default() -> Self {
        Self::new(4, Duration::from_millis(1000), 2)
    }
}

impl RetryTopology {
    /// `max_attempts` counts the original delivery; it is at least 1.
    pub fn new(max_attempts: usize, base_delay: Duration, multiplier: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            multiplier: multiplier.max(1),
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn retry_stage_count(&self) -> usize {
        self.max_attempts - 1
    }

    /// Main stage followed by every retry stage.
    pub fn stages(&self) -> Vec<Stage> {
        std::iter::once(Stage::Main)
            .chain((0..self.retry_stage_count()).map(Stage::Retry))
            .collect()
    }

    /// Retry stage a record failing at `stage` moves to, if any is left.
    pub fn next_retry(&self, stage: Stage) -> Option<usize> {
        let next = match stage {
            Stage::Main => 0,
            Stage::Retry(index) => index + 1,
        };
        (next < self.retry_stage_count()).then_some(next)
    }

    /// `base_delay * multiplier^index`.
    pub fn delay(&self, index: usize) -> Duration {
        let factor = u32::try_from(index)
            .ok()
            .and_then(|exp| self.multiplier.checked_pow(exp))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Topics a listener at `stage` subscribes to.
    pub fn topics_for(&self, stage: Stage, source_topics: &[String]) -> Vec<String> {
        match stage {
            Stage::Main => source_topics.to_vec(),
            Stage::Retry(index) => source_topics
                .iter()
                .map(|topic| retry_topic(topic, index))
                .collect(),
        }
    }

    pub fn group_id(&self, base_group: &str, stage: Stage) -> String {
        match stage {
            Stage::Main => base_group.to_string(),
            Stage::Retry(index) => format!("{}-retry-{}", base_group, index),
        }
    }
}
