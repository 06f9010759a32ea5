use tracing::info;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Upstream source usage metrics
#[derive(Debug, Default)]
pub struct SourceFetchMetrics {
    pub fetches: AtomicU64,
    pub failures: AtomicU64,
    pub records: AtomicU64,
    pub http_retries: AtomicU64,
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
}

impl SourceFetchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_fetch(&self, records: usize) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.records.fetch_add(records as u64, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.http_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> SourceFetchStats {
        SourceFetchStats {
            fetches: self.fetches.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            records: self.records.load(Ordering::Relaxed),
            http_retries: self.http_retries.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            fetches = stats.fetches,
            failures = stats.failures,
            records = stats.records,
            http_retries = stats.http_retries,
            cache_hits = stats.cache_hits,
            cache_misses = stats.cache_misses,
            "Source fetch metrics"
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFetchStats {
    pub fetches: u64,
    pub failures: u64,
    pub records: u64,
    pub http_retries: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

/// Global metrics instance
static SOURCE_METRICS: std::sync::LazyLock<SourceFetchMetrics> =
    std::sync::LazyLock::new(SourceFetchMetrics::new);

pub fn source_metrics() -> &'static SourceFetchMetrics {
    &SOURCE_METRICS
}

/// Span wrapping one report run, correlated across its source fetches
pub fn create_workflow_span(workflow: &str, correlation_id: &str) -> tracing::Span {
    tracing::info_span!(
        "workflow",
        workflow.name = workflow,
        correlation.id = correlation_id,
    )
}

/// Time an operation and log its duration
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis(),
            "Operation completed"
        );
    }
}
