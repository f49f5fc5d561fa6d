//! Human-readable renderings of a persisted report.
//!
//! - [`summary_html`]: a standalone HTML page for people opening a report link
//! - [`metrics_csv`]: per-service and per-operation rows for spreadsheets
//!
//! Both are derived on read from the stored [`Report`]; nothing here is
//! persisted.

use std::fmt::Write;

use crate::models::{LatencyStats, Report};

/// Prepended to CSV output so spreadsheet tools detect UTF-8.
pub const CSV_BOM: &str = "\u{feff}";

const CSV_HEADER: &str = "scope,name,traces,errors,errorRate,minMs,p50Ms,p90Ms,p95Ms,p99Ms,maxMs,meanMs";

/// Render `report` as a self-contained HTML document.
pub fn summary_html(report: &Report) -> String {
    let title = format!("{} trace report", capitalize(report.kind.as_str()));
    let mut out = String::with_capacity(4096);

    let _ = write!(
        out,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
         <style>body{{font-family:sans-serif;margin:2rem}}table{{border-collapse:collapse}}\
         th,td{{border:1px solid #ccc;padding:.3rem .6rem;text-align:right}}th:first-child,td:first-child{{text-align:left}}</style>\n\
         </head>\n<body>\n<h1>{title}</h1>\n",
        title = escape_html(&title),
    );

    let _ = write!(
        out,
        "<p>Window: {} &ndash; {} (UTC)<br>Generated: {}<br>Status: <strong>{}</strong></p>\n",
        report.window.start.format("%Y-%m-%d %H:%M"),
        report.window.end.format("%Y-%m-%d %H:%M"),
        report.generated_at.format("%Y-%m-%d %H:%M:%S"),
        report.status,
    );

    if let Some(error) = &report.error {
        let _ = writeln!(out, "<p class=\"error\">Error: {}</p>", escape_html(error));
    }

    let Some(metrics) = &report.metrics else {
        out.push_str("</body>\n</html>\n");
        return out;
    };

    let _ = write!(
        out,
        "<h2>Overview</h2>\n<table>\n\
         <tr><th>Traces</th><td>{}</td></tr>\n\
         <tr><th>Error traces</th><td>{}</td></tr>\n\
         <tr><th>Error rate</th><td>{}</td></tr>\n\
         <tr><th>Skipped records</th><td>{}</td></tr>\n",
        metrics.total_traces,
        metrics.error_traces,
        percent(metrics.error_rate),
        metrics.skipped,
    );
    if let Some(latency) = &metrics.latency {
        let _ = write!(
            out,
            "<tr><th>Latency p50 / p95 / p99</th><td>{} / {} / {} ms</td></tr>\n",
            latency.p50_ms, latency.p95_ms, latency.p99_ms
        );
    }
    out.push_str("</table>\n");

    if !metrics.services.is_empty() {
        out.push_str(
            "<h2>Services</h2>\n<table>\n<tr><th>Service</th><th>Traces</th><th>Errors</th>\
             <th>Error rate</th><th>p50 ms</th><th>p95 ms</th><th>p99 ms</th></tr>\n",
        );
        for (name, service) in &metrics.services {
            let (p50, p95, p99) = match &service.latency {
                Some(l) => (l.p50_ms.to_string(), l.p95_ms.to_string(), l.p99_ms.to_string()),
                None => ("-".into(), "-".into(), "-".into()),
            };
            let _ = writeln!(
                out,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape_html(name),
                service.traces,
                service.errors,
                percent(service.error_rate),
                p50,
                p95,
                p99,
            );
        }
        out.push_str("</table>\n");
    }

    if !metrics.operations.is_empty() {
        let mut operations: Vec<(&String, &u64)> = metrics.operations.iter().collect();
        // busiest first, name as tie-break
        operations.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        out.push_str("<h2>Operations</h2>\n<table>\n<tr><th>Operation</th><th>Traces</th></tr>\n");
        for (name, count) in operations {
            let _ = writeln!(out, "<tr><td>{}</td><td>{}</td></tr>", escape_html(name), count);
        }
        out.push_str("</table>\n");
    }

    out.push_str("</body>\n</html>\n");
    out
}

/// Render the metrics of `report` as CSV.
///
/// One `total` row, then one row per service and per operation. Reports
/// without metrics produce the header only.
pub fn metrics_csv(report: &Report) -> String {
    let mut out = String::from(CSV_BOM);
    out.push_str(CSV_HEADER);
    out.push('\n');

    let Some(metrics) = &report.metrics else {
        return out;
    };

    push_row(
        &mut out,
        "total",
        report.kind.as_str(),
        metrics.total_traces,
        Some(metrics.error_traces),
        Some(metrics.error_rate),
        metrics.latency.as_ref(),
    );
    for (name, service) in &metrics.services {
        push_row(
            &mut out,
            "service",
            name,
            service.traces,
            Some(service.errors),
            Some(service.error_rate),
            service.latency.as_ref(),
        );
    }
    for (name, count) in &metrics.operations {
        push_row(&mut out, "operation", name, *count, None, None, None);
    }
    out
}

fn push_row(
    out: &mut String,
    scope: &str,
    name: &str,
    traces: u64,
    errors: Option<u64>,
    error_rate: Option<f64>,
    latency: Option<&LatencyStats>,
) {
    let opt = |v: Option<String>| v.unwrap_or_default();
    let mut fields = vec![
        scope.to_string(),
        escape_csv(name),
        traces.to_string(),
        opt(errors.map(|e| e.to_string())),
        opt(error_rate.map(|r| format!("{r:.4}"))),
    ];
    match latency {
        Some(l) => fields.extend([
            l.min_ms.to_string(),
            l.p50_ms.to_string(),
            l.p90_ms.to_string(),
            l.p95_ms.to_string(),
            l.p99_ms.to_string(),
            l.max_ms.to_string(),
            format!("{:.2}", l.mean_ms),
        ]),
        None => fields.extend(std::iter::repeat(String::new()).take(7)),
    }
    out.push_str(&fields.join(","));
    out.push('\n');
}

fn escape_csv(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn percent(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
