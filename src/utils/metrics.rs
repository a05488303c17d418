use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Global metrics collector for the application.
///
/// Tracks outbound API usage, pipeline outcomes, and per-stage durations.
/// Thread-safe and can be shared across the application.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    // Outbound API call metrics (classification, search, detail, translation)
    api_calls_total: AtomicUsize,
    api_calls_success: AtomicUsize,
    api_calls_failed: AtomicUsize,
    api_latency_ms: RwLock<Vec<u64>>,

    // Pipeline outcome counters
    pipeline_runs: AtomicUsize,
    recipes_found: AtomicUsize,
    recipe_misses: AtomicUsize,
    pipeline_failures: AtomicUsize,

    // Per-stage durations
    normalize_duration_ms: RwLock<Vec<u64>>,
    classify_duration_ms: RwLock<Vec<u64>>,
    resolve_duration_ms: RwLock<Vec<u64>>,
    detail_duration_ms: RwLock<Vec<u64>>,
    translate_duration_ms: RwLock<Vec<u64>>,

    // Per-endpoint request counters
    endpoint_counters: DashMap<String, AtomicUsize>,

    // Start time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                api_calls_total: AtomicUsize::new(0),
                api_calls_success: AtomicUsize::new(0),
                api_calls_failed: AtomicUsize::new(0),
                api_latency_ms: RwLock::new(Vec::new()),
                pipeline_runs: AtomicUsize::new(0),
                recipes_found: AtomicUsize::new(0),
                recipe_misses: AtomicUsize::new(0),
                pipeline_failures: AtomicUsize::new(0),
                normalize_duration_ms: RwLock::new(Vec::new()),
                classify_duration_ms: RwLock::new(Vec::new()),
                resolve_duration_ms: RwLock::new(Vec::new()),
                detail_duration_ms: RwLock::new(Vec::new()),
                translate_duration_ms: RwLock::new(Vec::new()),
                endpoint_counters: DashMap::new(),
                start_time: Instant::now(),
            }),
        }
    }

    // Outbound API metrics
    pub fn record_api_call(&self, success: bool, duration: Duration) {
        self.inner.api_calls_total.fetch_add(1, Ordering::Relaxed);
        if success {
            self.inner.api_calls_success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.inner.api_calls_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.inner
            .api_latency_ms
            .write()
            .push(duration.as_millis() as u64);
    }

    // Pipeline outcome metrics
    pub fn record_recipe_found(&self) {
        self.inner.pipeline_runs.fetch_add(1, Ordering::Relaxed);
        self.inner.recipes_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_recipe_miss(&self) {
        self.inner.pipeline_runs.fetch_add(1, Ordering::Relaxed);
        self.inner.recipe_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pipeline_failure(&self) {
        self.inner.pipeline_runs.fetch_add(1, Ordering::Relaxed);
        self.inner.pipeline_failures.fetch_add(1, Ordering::Relaxed);
    }

    // Stage duration metrics
    pub fn record_normalize_duration(&self, duration: Duration) {
        self.inner
            .normalize_duration_ms
            .write()
            .push(duration.as_millis() as u64);
    }

    pub fn record_classify_duration(&self, duration: Duration) {
        self.inner
            .classify_duration_ms
            .write()
            .push(duration.as_millis() as u64);
    }

    pub fn record_resolve_duration(&self, duration: Duration) {
        self.inner
            .resolve_duration_ms
            .write()
            .push(duration.as_millis() as u64);
    }

    pub fn record_detail_duration(&self, duration: Duration) {
        self.inner
            .detail_duration_ms
            .write()
            .push(duration.as_millis() as u64);
    }

    pub fn record_translate_duration(&self, duration: Duration) {
        self.inner
            .translate_duration_ms
            .write()
            .push(duration.as_millis() as u64);
    }

    // Endpoint metrics
    pub fn record_endpoint_request(&self, endpoint: &str) {
        self.inner
            .endpoint_counters
            .entry(endpoint.to_string())
            .or_insert_with(|| AtomicUsize::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    // Get snapshot for reporting
    pub fn snapshot(&self) -> MetricsSnapshot {
        let api_latency = self.inner.api_latency_ms.read();
        let api_latency_avg = avg(&api_latency);
        let api_latency_p50 = percentile(&api_latency, 0.5);
        let api_latency_p95 = percentile(&api_latency, 0.95);
        let api_latency_p99 = percentile(&api_latency, 0.99);
        drop(api_latency);

        let normalize_avg = avg(&self.inner.normalize_duration_ms.read());
        let classify_avg = avg(&self.inner.classify_duration_ms.read());
        let resolve_avg = avg(&self.inner.resolve_duration_ms.read());
        let detail_avg = avg(&self.inner.detail_duration_ms.read());
        let translate_avg = avg(&self.inner.translate_duration_ms.read());

        let requests_by_endpoint = self
            .inner
            .endpoint_counters
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
            .collect();

        MetricsSnapshot {
            api_calls_total: self.inner.api_calls_total.load(Ordering::Relaxed),
            api_calls_success: self.inner.api_calls_success.load(Ordering::Relaxed),
            api_calls_failed: self.inner.api_calls_failed.load(Ordering::Relaxed),
            api_latency_avg_ms: api_latency_avg,
            api_latency_p50_ms: api_latency_p50,
            api_latency_p95_ms: api_latency_p95,
            api_latency_p99_ms: api_latency_p99,
            pipeline_runs: self.inner.pipeline_runs.load(Ordering::Relaxed),
            recipes_found: self.inner.recipes_found.load(Ordering::Relaxed),
            recipe_misses: self.inner.recipe_misses.load(Ordering::Relaxed),
            pipeline_failures: self.inner.pipeline_failures.load(Ordering::Relaxed),
            normalize_avg_ms: normalize_avg,
            classify_avg_ms: classify_avg,
            resolve_avg_ms: resolve_avg,
            detail_avg_ms: detail_avg,
            translate_avg_ms: translate_avg,
            requests_by_endpoint,
            uptime_seconds: self.inner.start_time.elapsed().as_secs(),
        }
    }

    /// Generate Prometheus-format metrics
    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        let mut out = format!(
            r#"# HELP api_calls_total Total number of outbound API calls made
# TYPE api_calls_total counter
api_calls_total {{}} {}

# HELP api_calls_success Number of successful outbound API calls
# TYPE api_calls_success counter
api_calls_success {{}} {}

# HELP api_calls_failed Number of failed outbound API calls
# TYPE api_calls_failed counter
api_calls_failed {{}} {}

# HELP api_latency_avg_ms Average outbound API latency in milliseconds
# TYPE api_latency_avg_ms gauge
api_latency_avg_ms {{}} {}

# HELP pipeline_runs_total Total number of pipeline executions
# TYPE pipeline_runs_total counter
pipeline_runs_total {{}} {}

# HELP recipes_found_total Pipeline runs that resolved a recipe
# TYPE recipes_found_total counter
recipes_found_total {{}} {}

# HELP recipe_misses_total Pipeline runs with no matching recipe
# TYPE recipe_misses_total counter
recipe_misses_total {{}} {}

# HELP pipeline_failures_total Pipeline runs that ended in a hard failure
# TYPE pipeline_failures_total counter
pipeline_failures_total {{}} {}

# HELP stage_avg_duration_ms Average stage duration in milliseconds
# TYPE stage_avg_duration_ms gauge
stage_avg_duration_ms {{stage="normalize"}} {}
stage_avg_duration_ms {{stage="classify"}} {}
stage_avg_duration_ms {{stage="resolve"}} {}
stage_avg_duration_ms {{stage="detail"}} {}
stage_avg_duration_ms {{stage="translate"}} {}

# HELP uptime_seconds Application uptime in seconds
# TYPE uptime_seconds counter
uptime_seconds {{}} {}

# HELP http_requests_total Requests received per endpoint
# TYPE http_requests_total counter
"#,
            snapshot.api_calls_total,
            snapshot.api_calls_success,
            snapshot.api_calls_failed,
            snapshot.api_latency_avg_ms,
            snapshot.pipeline_runs,
            snapshot.recipes_found,
            snapshot.recipe_misses,
            snapshot.pipeline_failures,
            snapshot.normalize_avg_ms,
            snapshot.classify_avg_ms,
            snapshot.resolve_avg_ms,
            snapshot.detail_avg_ms,
            snapshot.translate_avg_ms,
            snapshot.uptime_seconds,
        );

        let mut endpoints: Vec<_> = snapshot.requests_by_endpoint.iter().collect();
        endpoints.sort();
        for (endpoint, count) in endpoints {
            out.push_str(&format!(
                "http_requests_total {{endpoint=\"{endpoint}\"}} {count}\n"
            ));
        }
        out
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub api_calls_total: usize,
    pub api_calls_success: usize,
    pub api_calls_failed: usize,
    pub api_latency_avg_ms: u64,
    pub api_latency_p50_ms: u64,
    pub api_latency_p95_ms: u64,
    pub api_latency_p99_ms: u64,
    pub pipeline_runs: usize,
    pub recipes_found: usize,
    pub recipe_misses: usize,
    pub pipeline_failures: usize,
    pub normalize_avg_ms: u64,
    pub classify_avg_ms: u64,
    pub resolve_avg_ms: u64,
    pub detail_avg_ms: u64,
    pub translate_avg_ms: u64,
    pub requests_by_endpoint: HashMap<String, usize>,
    pub uptime_seconds: u64,
}

fn percentile(values: &[u64], p: f64) -> u64 {
    if values.is_empty() {
        return 0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let idx = ((values.len() as f64 - 1.0) * p) as usize;
    sorted[idx]
}

fn avg(values: &[u64]) -> u64 {
    if values.is_empty() {
        return 0;
    }
    values.iter().sum::<u64>() / values.len() as u64
}
