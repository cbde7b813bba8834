//! Prometheus metrics registry and instruments.
//!
//! Instruments are always recorded; they only become visible through
//! [`gather_metrics`] after [`init_metrics`] has registered them.

use std::sync::Once;
use std::time::Duration;

use lazy_static::lazy_static;
use prometheus::{Encoder, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // API Metrics
    pub static ref API_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("rustroom_api_requests_total", "Total number of remote API requests"),
        &["method", "outcome"]
    ).expect("metric can be created");
    pub static ref API_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "rustroom_api_request_duration_seconds",
            "Remote API request duration in seconds"
        ).buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["method"]
    ).expect("metric can be created");

    // Collection Metrics
    pub static ref FETCHES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("rustroom_fetches_total", "Collection fetches by slot and result"),
        &["slot", "result"]
    ).expect("metric can be created");
    pub static ref COALESCED_FETCHES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("rustroom_coalesced_fetches_total", "Load/refresh calls joined to an in-flight fetch"),
        &["slot"]
    ).expect("metric can be created");
    pub static ref STALE_RESPONSES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("rustroom_stale_responses_total", "Search responses discarded for an older generation"),
        &["query"]
    ).expect("metric can be created");

    // Mutation Metrics
    pub static ref MUTATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("rustroom_mutations_total", "Optimistic mutations by kind and outcome"),
        &["kind", "outcome"]
    ).expect("metric can be created");
}

static INIT: Once = Once::new();

/// Initialize metrics registry.
///
/// Safe to call more than once.
pub fn init_metrics() {
    INIT.call_once(|| {
        REGISTRY
            .register(Box::new(API_REQUESTS_TOTAL.clone()))
            .expect("API_REQUESTS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(API_REQUEST_DURATION_SECONDS.clone()))
            .expect("API_REQUEST_DURATION_SECONDS can be registered");
        REGISTRY
            .register(Box::new(FETCHES_TOTAL.clone()))
            .expect("FETCHES_TOTAL can be registered");
        REGISTRY
            .register(Box::new(COALESCED_FETCHES_TOTAL.clone()))
            .expect("COALESCED_FETCHES_TOTAL can be registered");
        REGISTRY
            .register(Box::new(STALE_RESPONSES_TOTAL.clone()))
            .expect("STALE_RESPONSES_TOTAL can be registered");
        REGISTRY
            .register(Box::new(MUTATIONS_TOTAL.clone()))
            .expect("MUTATIONS_TOTAL can be registered");

        tracing::info!("Metrics registry initialized");
    });
}

/// Render all registered metrics in the Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(error) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!(%error, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

pub(crate) fn record_api_request(method: &str, outcome: &str, elapsed: Duration) {
    API_REQUESTS_TOTAL
        .with_label_values(&[method, outcome])
        .inc();
    API_REQUEST_DURATION_SECONDS
        .with_label_values(&[method])
        .observe(elapsed.as_secs_f64());
}
