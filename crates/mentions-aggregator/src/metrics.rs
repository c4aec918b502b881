//! Observability hooks for the aggregation cycle.

use std::time::Duration;

/// Timer, counter, and gauge hooks. Every method defaults to a no-op.
pub trait MetricsSink: Send + Sync {
    fn fetch_duration(&self, _platform: &str, _elapsed: Duration) {}
    fn write_duration(&self, _brand: &str, _elapsed: Duration) {}
    fn normalize_duration(&self, _platform: &str, _elapsed: Duration) {}
    fn dedup_duration(&self, _elapsed: Duration) {}
    fn mentions_fetched(&self, _platform: &str, _count: usize) {}
    fn mentions_invalid(&self, _platform: &str, _count: usize) {}
    fn mentions_duplicate(&self, _platform: &str, _count: usize) {}
    fn tracked_brands(&self, _count: usize) {}
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {}

/// Emits each observation as a `debug` tracing event under the `metrics` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMetrics;

pub(crate) fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

impl MetricsSink for TracingMetrics {
    fn fetch_duration(&self, platform: &str, elapsed: Duration) {
        tracing::debug!(target: "metrics", platform, ms = duration_ms(elapsed), "fetch_duration");
    }

    fn write_duration(&self, brand: &str, elapsed: Duration) {
        tracing::debug!(target: "metrics", brand, ms = duration_ms(elapsed), "write_duration");
    }

    fn normalize_duration(&self, platform: &str, elapsed: Duration) {
        tracing::debug!(
            target: "metrics",
            platform,
            ms = duration_ms(elapsed),
            "normalize_duration"
        );
    }

    fn dedup_duration(&self, elapsed: Duration) {
        tracing::debug!(target: "metrics", ms = duration_ms(elapsed), "dedup_duration");
    }

    fn mentions_fetched(&self, platform: &str, count: usize) {
        tracing::debug!(target: "metrics", platform, count, "mentions_fetched");
    }

    fn mentions_invalid(&self, platform: &str, count: usize) {
        tracing::debug!(target: "metrics", platform, count, "mentions_invalid");
    }

    fn mentions_duplicate(&self, platform: &str, count: usize) {
        tracing::debug!(target: "metrics", platform, count, "mentions_duplicate");
    }

    fn tracked_brands(&self, count: usize) {
        tracing::debug!(target: "metrics", count, "tracked_brands");
    }
}
