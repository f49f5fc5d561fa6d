//! Domain types shared by the query client, the aggregator, the generator
//! and the persistence layer.

pub mod macros;
pub mod metrics;
pub mod report;
pub mod time;
pub mod trace;

pub use metrics::{LatencyStats, ReportMetrics, ServiceMetrics};
pub use report::{ParseReportKindError, Report, ReportId, ReportKind, ReportStatus};
pub use time::TimeWindow;
pub use trace::{TraceQuery, TraceRecord};
