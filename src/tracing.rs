//! Tracing (logging)

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter of the server binary.
pub const SERVER_LOG_FILTER: &str = "student_perf=debug,tower_http=debug";

/// Default filter of the ingestion binary. Per-row insert events are at debug level.
pub const INGEST_LOG_FILTER: &str = "student_perf=info,student_perf_ingest=info";

/// Initialise tracing (logging)
///
/// Applies a filter based on the `RUST_LOG` environment variable, falling back to
/// `default_filter` if not set.
pub fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
