//! This crate provides a REST API over a student performance dataset held in a single SQLite
//! table, together with a one-time CSV ingestion step that populates the table.
//!
//! The API serves the raw records, per-student and per-school grades, and grade averages grouped
//! by a categorical column. Create, update, delete and filter endpoints complete the set.
//!
//! The service is built on top of a number of open source components.
//!
//! * [Tokio](tokio), the most popular asynchronous Rust runtime.
//! * [Axum](axum) web framework, built by the Tokio team, on top of the [hyper] HTTP library.
//! * [Serde](serde) performs (de)serialisation of JSON request and response data.
//! * [rusqlite] provides the SQLite storage. Statements run on Tokio's blocking thread pool.
//! * [csv] parses ingestion input.

pub mod app;
pub mod app_state;
pub mod cli;
pub mod error;
pub mod ingest;
pub mod json_payload;
pub mod metrics;
pub mod models;
pub mod server;
pub mod store;
#[cfg(test)]
pub mod test_utils;
pub mod tracing;
