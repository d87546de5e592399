//! This file defines the student-perf server binary entry point.

use student_perf::app;
use student_perf::app_state::AppState;
use student_perf::cli;
use student_perf::metrics;
use student_perf::server;
use student_perf::tracing;

use std::process::ExitCode;
use std::sync::Arc;

/// Application entry point
#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();
    tracing::init_tracing(tracing::SERVER_LOG_FILTER);
    ::tracing::debug!("{:?}", args);
    if let Err(err) = metrics::register_metrics() {
        ::tracing::error!("failed to register metrics: {err}");
        return ExitCode::FAILURE;
    }
    let state = match AppState::new(&args) {
        Ok(state) => Arc::new(state),
        Err(err) => {
            ::tracing::error!("failed to open database {}: {err}", args.database);
            return ExitCode::FAILURE;
        }
    };
    let service = app::service(state);
    if let Err(err) = server::serve(&args, service).await {
        ::tracing::error!("server error: {err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
