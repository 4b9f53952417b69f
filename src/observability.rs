//! Tracing setup and in-process run counters

use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber, honouring `RUST_LOG` (default `info`)
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Counters for processed messages and handler runs
#[derive(Debug, Default)]
pub struct Metrics {
    messages_received: AtomicU64,
    messages_unmatched: AtomicU64,
    runs_succeeded: AtomicU64,
    runs_failed: AtomicU64,
    warnings_raised: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "messages_received", "Metric incremented");
    }

    pub fn message_unmatched(&self) {
        self.messages_unmatched.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "messages_unmatched", "Metric incremented");
    }

    pub fn run_succeeded(&self) {
        self.runs_succeeded.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "runs_succeeded", "Metric incremented");
    }

    pub fn run_failed(&self) {
        self.runs_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "runs_failed", "Metric incremented");
    }

    pub fn warnings_raised(&self, count: u32) {
        if count > 0 {
            self.warnings_raised.fetch_add(u64::from(count), Ordering::Relaxed);
            tracing::debug!(counter = "warnings_raised", count, "Metric incremented");
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_unmatched: self.messages_unmatched.load(Ordering::Relaxed),
            runs_succeeded: self.runs_succeeded.load(Ordering::Relaxed),
            runs_failed: self.runs_failed.load(Ordering::Relaxed),
            warnings_raised: self.warnings_raised.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub messages_received: u64,
    pub messages_unmatched: u64,
    pub runs_succeeded: u64,
    pub runs_failed: u64,
    pub warnings_raised: u64,
}
