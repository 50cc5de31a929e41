//! Structured logging configuration.
//!
//! Sets up the `tracing` subscriber with:
//! - An `EnvFilter` (`RUST_LOG` wins over the configured level)
//! - Plain text or JSON output
//! - Spans for search, refresh and rebuild operations

use tracing_subscriber::{
    filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Registry,
};

/// Initialize tracing.
///
/// Logs go to stderr so result listings on stdout stay machine-readable.
///
/// # Panics
///
/// Panics if a global subscriber has already been installed in this process.
pub fn init_tracing(level: &str, json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        let json_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(true)
            .with_line_number(true);

        Registry::default().with(env_filter).with(json_layer).init();
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true);

        Registry::default().with(env_filter).with(fmt_layer).init();
    }

    tracing::debug!(level, json, "Tracing initialized");
}

/// Spans for the engine's long-running operations.
pub mod spans {
    use tracing::{debug_span, info_span, Span};

    /// Span for one search request.
    #[must_use]
    pub fn search_span(query: &str) -> Span {
        debug_span!("search", query_len = query.chars().count())
    }

    /// Span for a provider refresh.
    #[must_use]
    pub fn refresh_span(provider: &str, force: bool) -> Span {
        debug_span!("provider_refresh", provider = %provider, force)
    }

    /// Span for a user-requested index rebuild.
    #[must_use]
    pub fn rebuild_span() -> Span {
        info_span!("rebuild_index")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spans_can_be_entered() {
        for span in [
            spans::search_span("foo"),
            spans::refresh_span("files", true),
            spans::rebuild_span(),
        ] {
            let _guard = span.enter();
        }
    }
}
