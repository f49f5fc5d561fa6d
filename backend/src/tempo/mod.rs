//! Trace backend access.
//!
//! [`TraceQueryClient`] is the seam the generator talks to; [`TempoClient`]
//! implements it over the backend's HTTP query API:
//!
//! - `GET /api/traces/{id}`
//! - `GET /api/search?q=&start=&end=&limit=` (ISO-8601 bounds)
//!
//! The client performs no retries. Retry policy belongs to the caller, which
//! can ask [`TraceQueryError::is_retryable`].

pub mod client;
pub mod error;

pub use client::{TempoClient, TraceQueryClient};
pub use error::{TraceQueryError, TraceQueryResult};
