//! # Trace Report
//!
//! Periodic report generation over a distributed-tracing backend.
//!
//! A run for a report kind (`daily`, `weekly`, `monthly`) resolves the time
//! window the report covers, searches the trace backend for that window,
//! aggregates the results into metrics and persists a report document that
//! downstream services read. Runs are triggered on demand over HTTP or by an
//! external scheduler invoking the `generate-report` binary, and at most one
//! run per kind is in flight at any time.
//!
//! ## Architecture
//!
//! - [`config`]: TOML configuration with environment overrides
//! - [`models`]: report, window and metrics types
//! - [`tempo`]: trace backend client
//! - [`db`]: report repository and storage backends
//! - [`services`]: aggregation, generation and dispatch
//! - [`http`]: Axum-based HTTP server and request handlers
//! - [`logging`]: tracing subscriber setup for the binaries

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod services;
pub mod tempo;

#[cfg(feature = "http-server")]
pub mod http;
