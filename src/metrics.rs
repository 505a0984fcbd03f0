//! Process-local crawl counters, logged periodically via `tracing`.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Metrics {
    pub pages_fetched: AtomicU64,
    pub pages_errored: AtomicU64,
    pub html_queued: AtomicU64,
    pub robots_rejections: AtomicU64,
    pub seen_rejections: AtomicU64,
    pub bloom_failures: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics::default()
    }

    pub fn incr_fetched(&self) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_errored(&self) {
        self.pages_errored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_html_queued(&self) {
        self.html_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_robots_rejections(&self) {
        self.robots_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_seen_rejections(&self) {
        self.seen_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_bloom_failures(&self) {
        self.bloom_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn log_snapshot(&self) {
        tracing::info!(
            pages_fetched = self.pages_fetched.load(Ordering::Relaxed),
            pages_errored = self.pages_errored.load(Ordering::Relaxed),
            html_queued = self.html_queued.load(Ordering::Relaxed),
            robots_rejections = self.robots_rejections.load(Ordering::Relaxed),
            seen_rejections = self.seen_rejections.load(Ordering::Relaxed),
            bloom_failures = self.bloom_failures.load(Ordering::Relaxed),
            "crawl metrics snapshot"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn counters_start_at_zero_and_increment() {
        let m = Metrics::new();
        assert_eq!(m.pages_fetched.load(Ordering::Relaxed), 0);
        m.incr_fetched();
        m.incr_fetched();
        assert_eq!(m.pages_fetched.load(Ordering::Relaxed), 2);
    }
}
