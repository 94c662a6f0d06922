use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by every worker of the orchestrator.
#[derive(Debug, Default)]
pub struct PipelineStats {
    received: AtomicU64,
    applied: AtomicU64,
    skipped: AtomicU64,
    escalated: AtomicU64,
    dead_lettered: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub received: u64,
    /// Upserts and deletes.
    pub applied: u64,
    /// Heartbeats and entities the owning service no longer knows.
    pub skipped: u64,
    pub escalated: u64,
    pub dead_lettered: u64,
    /// Records left unacknowledged because escalation itself failed.
    pub failed: u64,
}

impl PipelineStats {
    pub(crate) fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_applied(&self) {
        self.applied.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_escalated(&self) {
        self.escalated.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dead_lettered(&self) {
        self.dead_lettered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            applied: self.applied.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            escalated: self.escalated.load(Ordering::Relaxed),
            dead_lettered: self.dead_lettered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}
