//! Atomic counters for relay observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`RelayMetrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. on shutdown or a daemon tick). The struct
//! is owned by the relay context and threaded through `Arc`, not held in
//! a process-wide static.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lightweight atomic counters — no allocations, no locking.
pub struct RelayMetrics {
    events_routed: AtomicU64,
    chunks_processed: AtomicU64,
    lines_emitted: AtomicU64,
    backlog_syncs: AtomicU64,
    persist_failures: AtomicU64,
}

impl Default for RelayMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayMetrics {
    pub const fn new() -> Self {
        Self {
            events_routed: AtomicU64::new(0),
            chunks_processed: AtomicU64::new(0),
            lines_emitted: AtomicU64::new(0),
            backlog_syncs: AtomicU64::new(0),
            persist_failures: AtomicU64::new(0),
        }
    }

    /// Increment the events-routed counter by one.
    pub fn inc_events_routed(&self) {
        self.events_routed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "events_routed", "counter incremented");
    }

    /// Increment the chunks-processed counter by one.
    pub fn inc_chunks_processed(&self) {
        self.chunks_processed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "chunks_processed", "counter incremented");
    }

    /// Add the number of lines emitted by one chunk.
    pub fn add_lines_emitted(&self, count: u64) {
        self.lines_emitted.fetch_add(count, Ordering::Relaxed);
        tracing::trace!(metric = "lines_emitted", count, "counter incremented");
    }

    /// Increment the backlog-syncs counter by one.
    pub fn inc_backlog_syncs(&self) {
        self.backlog_syncs.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "backlog_syncs", "counter incremented");
    }

    /// Increment the persist-failures counter by one.
    pub fn inc_persist_failures(&self) {
        self.persist_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "persist_failures", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    ///
    /// Call this at natural boundaries (shutdown, daemon tick) rather than
    /// on every increment.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            events_routed = self.events_routed(),
            chunks_processed = self.chunks_processed(),
            lines_emitted = self.lines_emitted(),
            backlog_syncs = self.backlog_syncs(),
            persist_failures = self.persist_failures(),
        );
    }

    /// Read the current events-routed count.
    pub fn events_routed(&self) -> u64 {
        self.events_routed.load(Ordering::Relaxed)
    }

    /// Read the current chunks-processed count.
    pub fn chunks_processed(&self) -> u64 {
        self.chunks_processed.load(Ordering::Relaxed)
    }

    /// Read the current lines-emitted count.
    pub fn lines_emitted(&self) -> u64 {
        self.lines_emitted.load(Ordering::Relaxed)
    }

    /// Read the current backlog-syncs count.
    pub fn backlog_syncs(&self) -> u64 {
        self.backlog_syncs.load(Ordering::Relaxed)
    }

    /// Read the current persist-failures count.
    pub fn persist_failures(&self) -> u64 {
        self.persist_failures.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.events_routed.store(0, Ordering::Relaxed);
        self.chunks_processed.store(0, Ordering::Relaxed);
        self.lines_emitted.store(0, Ordering::Relaxed);
        self.backlog_syncs.store(0, Ordering::Relaxed);
        self.persist_failures.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = RelayMetrics::new();
        assert_eq!(m.events_routed(), 0);
        m.inc_events_routed();
        m.inc_events_routed();
        assert_eq!(m.events_routed(), 2);

        m.inc_chunks_processed();
        assert_eq!(m.chunks_processed(), 1);

        m.add_lines_emitted(3);
        m.add_lines_emitted(2);
        assert_eq!(m.lines_emitted(), 5);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = RelayMetrics::new();
        m.inc_events_routed();
        m.inc_chunks_processed();
        m.add_lines_emitted(7);
        m.inc_backlog_syncs();
        m.inc_persist_failures();
        m.reset();
        assert_eq!(m.events_routed(), 0);
        assert_eq!(m.chunks_processed(), 0);
        assert_eq!(m.lines_emitted(), 0);
        assert_eq!(m.backlog_syncs(), 0);
        assert_eq!(m.persist_failures(), 0);
    }
}
