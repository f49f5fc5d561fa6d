//! Report aggregation.
//!
//! Turns the raw search results for a window into [`ReportMetrics`]. The
//! reduction is pure and independent of record order: the backend gives no
//! ordering guarantee, so every statistic here is computed from sorted samples,
//! integer sums or ordered maps.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::models::{LatencyStats, ReportKind, ReportMetrics, ServiceMetrics, TimeWindow, TraceRecord};

/// Label used when a trace does not name its root service or operation.
pub const UNKNOWN_LABEL: &str = "<unknown>";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregationError {
    /// Every record in a non-empty result set failed to parse.
    #[error("all {total} trace records were malformed")]
    Unparseable { total: usize },
}

/// The fields of one search result the report cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TraceSummary {
    service: String,
    operation: String,
    duration_ms: Option<u64>,
    error: bool,
}

/// Compute report metrics for `records` collected over `window`.
///
/// Malformed records are skipped and counted in `skipped`. An empty input
/// yields zero metrics; a non-empty input in which nothing parses is an
/// [`AggregationError::Unparseable`].
pub fn aggregate(
    kind: ReportKind,
    window: &TimeWindow,
    records: &[TraceRecord],
) -> Result<ReportMetrics, AggregationError> {
    let summaries: Vec<TraceSummary> = records.iter().filter_map(parse_record).collect();
    let skipped = records.len() - summaries.len();

    if !records.is_empty() && summaries.is_empty() {
        return Err(AggregationError::Unparseable {
            total: records.len(),
        });
    }

    let mut per_service: BTreeMap<String, (u64, u64, Vec<u64>)> = BTreeMap::new();
    let mut operations: BTreeMap<String, u64> = BTreeMap::new();
    let mut durations = Vec::with_capacity(summaries.len());
    let mut error_traces = 0u64;

    for summary in summaries {
        let entry = per_service.entry(summary.service).or_default();
        entry.0 += 1;
        if summary.error {
            entry.1 += 1;
            error_traces += 1;
        }
        if let Some(ms) = summary.duration_ms {
            entry.2.push(ms);
            durations.push(ms);
        }
        *operations.entry(summary.operation).or_default() += 1;
    }

    let services: BTreeMap<String, ServiceMetrics> = per_service
        .into_iter()
        .map(|(name, (traces, errors, samples))| {
            let metrics = ServiceMetrics {
                traces,
                errors,
                error_rate: ratio(errors, traces),
                latency: latency_stats(samples),
            };
            (name, metrics)
        })
        .collect();

    let total_traces = services.values().map(|s| s.traces).sum();
    let metrics = ReportMetrics {
        total_traces,
        error_traces,
        error_rate: ratio(error_traces, total_traces),
        skipped: skipped as u64,
        latency: latency_stats(durations),
        services,
        operations,
    };

    debug!(
        %kind,
        window_start = %window.start,
        window_end = %window.end,
        total = metrics.total_traces,
        skipped = metrics.skipped,
        "aggregated trace records"
    );
    Ok(metrics)
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole > 0 {
        part as f64 / whole as f64
    } else {
        0.0
    }
}

/// Nearest-rank latency summary; `None` without samples.
fn latency_stats(mut samples: Vec<u64>) -> Option<LatencyStats> {
    if samples.is_empty() {
        return None;
    }
    samples.sort_unstable();

    let count = samples.len();
    let sum: u128 = samples.iter().map(|&ms| u128::from(ms)).sum();
    let rank = |p: f64| -> u64 {
        let idx = ((p / 100.0) * count as f64).ceil() as usize;
        samples[idx.clamp(1, count) - 1]
    };

    Some(LatencyStats {
        samples: count as u64,
        min_ms: samples[0],
        max_ms: samples[count - 1],
        mean_ms: sum as f64 / count as f64,
        p50_ms: rank(50.0),
        p90_ms: rank(90.0),
        p95_ms: rank(95.0),
        p99_ms: rank(99.0),
    })
}

/// Interpret one search result. `None` marks the record as malformed.
fn parse_record(record: &TraceRecord) -> Option<TraceSummary> {
    let obj = record.as_object()?;
    obj.get("traceID")?.as_str().filter(|id| !id.is_empty())?;

    let label = |key: &str| -> Option<String> {
        match obj.get(key) {
            None | Some(Value::Null) => Some(UNKNOWN_LABEL.to_string()),
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::String(_)) => Some(UNKNOWN_LABEL.to_string()),
            Some(_) => None,
        }
    };

    let duration_ms = match obj.get("durationMs") {
        None | Some(Value::Null) => None,
        Some(v) => Some(parse_duration(v)?),
    };

    Some(TraceSummary {
        service: label("rootServiceName")?,
        operation: label("rootTraceName")?,
        duration_ms,
        error: has_error_span(obj),
    })
}

fn parse_duration(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|ms| ms.is_finite() && *ms >= 0.0)
            .map(|ms| ms.round() as u64)
    })
}

/// True if any matched span reports an error status or a 5xx response.
fn has_error_span(trace: &Map<String, Value>) -> bool {
    let single = trace.get("spanSet").into_iter();
    let many = trace
        .get("spanSets")
        .and_then(Value::as_array)
        .into_iter()
        .flatten();

    single
        .chain(many)
        .filter_map(|set| set.get("spans").and_then(Value::as_array))
        .flatten()
        .filter_map(|span| span.get("attributes").and_then(Value::as_array))
        .flatten()
        .any(is_error_attribute)
}

fn is_error_attribute(attribute: &Value) -> bool {
    let Some(key) = attribute.get("key").and_then(Value::as_str) else {
        return false;
    };
    let value = attribute.get("value");

    match key {
        "status" | "status.code" | "otel.status_code" => value
            .and_then(|v| v.get("stringValue"))
            .and_then(Value::as_str)
            .is_some_and(|s| s.to_ascii_lowercase().contains("error")),
        "http.status_code" | "http.response.status_code" => value
            .and_then(|v| v.get("intValue"))
            .and_then(|v| v.as_i64().or_else(|| v.as_str()?.parse().ok()))
            .is_some_and(|code| code >= 500),
        _ => false,
    }
}

#[cfg(test)]
#[path = "aggregator_tests.rs"]
mod tests;
