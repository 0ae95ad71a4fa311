use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing relay activity since startup.
#[derive(Default)]
pub struct RelayMetrics {
    documents_ingested: AtomicU64,
    ingest_failures: AtomicU64,
    replies_relayed: AtomicU64,
    relay_failures: AtomicU64,
}

impl RelayMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a document batch the provider reported as completed.
    pub fn record_ingest(&self) {
        self.documents_ingested.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed upload request.
    pub fn record_ingest_failure(&self) {
        self.ingest_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an agent reply returned to the caller.
    pub fn record_reply(&self) {
        self.replies_relayed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed relay request.
    pub fn record_relay_failure(&self) {
        self.relay_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_ingested: self.documents_ingested.load(Ordering::Relaxed),
            ingest_failures: self.ingest_failures.load(Ordering::Relaxed),
            replies_relayed: self.replies_relayed.load(Ordering::Relaxed),
            relay_failures: self.relay_failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of relay counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents indexed successfully.
    pub documents_ingested: u64,
    /// Upload requests that ended in an error response.
    pub ingest_failures: u64,
    /// Agent replies returned to callers.
    pub replies_relayed: u64,
    /// Relay requests that ended in an error response.
    pub relay_failures: u64,
}
