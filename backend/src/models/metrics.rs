//! Metrics payload of a completed report.
//!
//! The shape is owned by this crate rather than the downstream readers, who
//! only rely on the report envelope. Maps are ordered so a serialized report
//! is byte-for-byte deterministic for a given set of traces.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Aggregated view of every trace that fell inside a report window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetrics {
    /// Traces that parsed successfully
    pub total_traces: u64,
    /// Traces carrying at least one error span
    pub error_traces: u64,
    /// `error_traces / total_traces`, 0.0 when there are no traces
    pub error_rate: f64,
    /// Records dropped because they did not have the expected shape
    pub skipped: u64,
    /// Root-span latency over traces that reported a duration
    pub latency: Option<LatencyStats>,
    /// Per root service breakdown
    pub services: BTreeMap<String, ServiceMetrics>,
    /// Trace counts per root operation
    pub operations: BTreeMap<String, u64>,
}

impl ReportMetrics {
    pub fn is_empty(&self) -> bool {
        self.total_traces == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceMetrics {
    pub traces: u64,
    pub errors: u64,
    pub error_rate: f64,
    pub latency: Option<LatencyStats>,
}

/// Nearest-rank latency summary in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyStats {
    pub samples: u64,
    pub min_ms: u64,
    pub max_ms: u64,
    pub mean_ms: f64,
    pub p50_ms: u64,
    pub p90_ms: u64,
    pub p95_ms: u64,
    pub p99_ms: u64,
}
