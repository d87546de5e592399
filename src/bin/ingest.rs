//! This file defines the student-perf-ingest binary entry point.
//!
//! Loads a CSV file into the `Student` table of the service database.

use student_perf::cli;
use student_perf::ingest;
use student_perf::tracing;

use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = cli::parse_ingest();
    tracing::init_tracing(tracing::INGEST_LOG_FILTER);
    match ingest::ingest_file(&args.csv_file, &args.database, args.delimiter) {
        Ok(summary) => {
            ::tracing::info!(
                inserted = summary.inserted,
                failed = summary.failed,
                "loaded {} into {}",
                args.csv_file,
                args.database
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            ::tracing::error!("failed to load {}: {err}", args.csv_file);
            let mut current = err.source();
            while let Some(source) = current {
                ::tracing::error!("Caused by: {source}");
                current = source.source();
            }
            ExitCode::FAILURE
        }
    }
}
