//! Logging and metrics.

mod metrics;
mod observability;

pub use metrics::{
    init_metrics, render_metrics, AGGREGATE_SIZE, INDEXED_ITEMS, REFRESH_TOTAL, SEARCH_LATENCY,
    TEXT_SEARCH_CANCELLED,
};
pub use observability::{init_tracing, spans};
