//! Prometheus metrics definitions.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    register_int_gauge_vec, Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge,
    IntGaugeVec, TextEncoder,
};

/// Items in each provider's latest snapshot.
pub static INDEXED_ITEMS: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "quicksearch_indexed_items",
        "Items in each provider snapshot",
        &["provider"]
    )
    .unwrap()
});

/// Items in the deduplicated aggregate.
pub static AGGREGATE_SIZE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "quicksearch_aggregate_items",
        "Items in the deduplicated aggregate index"
    )
    .unwrap()
});

/// Provider refreshes by outcome.
pub static REFRESH_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "quicksearch_refresh_total",
        "Provider refreshes by outcome",
        &["provider", "outcome"]
    )
    .unwrap()
});

/// Search latency histogram.
pub static SEARCH_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "quicksearch_search_duration_seconds",
        "Search latency in seconds",
        &["query"],
        vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .unwrap()
});

/// Text scans abandoned for a newer query.
pub static TEXT_SEARCH_CANCELLED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "quicksearch_text_search_cancelled_total",
        "Text scans cancelled by a newer query"
    )
    .unwrap()
});

/// Initialize all metrics (call once at startup).
pub fn init_metrics() {
    // Access lazy statics to register them
    let _ = &*INDEXED_ITEMS;
    let _ = &*AGGREGATE_SIZE;
    let _ = &*REFRESH_TOTAL;
    let _ = &*SEARCH_LATENCY;
    let _ = &*TEXT_SEARCH_CANCELLED;

    tracing::debug!("Prometheus metrics initialized");
}

/// Encode every registered metric in the text exposition format.
#[must_use]
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
