//! Trace backend request and record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::time::TimeWindow;

/// One trace as returned by the backend. The structure is backend-defined;
/// only the aggregator interprets it.
pub type TraceRecord = serde_json::Value;

/// A search request against the trace backend.
///
/// Unset bounds are left to the backend (or the client's configured default
/// lookback).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceQuery {
    pub query: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

impl TraceQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Default::default()
        }
    }

    /// Restrict the search to `[window.start, window.end)`.
    pub fn within(mut self, window: &TimeWindow) -> Self {
        self.start = Some(window.start);
        self.end = Some(window.end);
        self
    }

    pub fn with_limit(mut self, limit: Option<u32>) -> Self {
        self.limit = limit;
        self
    }
}
