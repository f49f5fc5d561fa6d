//! Report envelope persisted for downstream consumers.
//!
//! The `{kind, window, status}` envelope is load-bearing for the notice and
//! notification services; the `metrics` payload is described in
//! [`crate::models::metrics`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metrics::ReportMetrics;
use super::time::TimeWindow;
use crate::define_uuid_id;

define_uuid_id!(
    /// Identifier of a stored report.
    ReportId
);

/// Report cadence. Determines the window length and how often the external
/// scheduler invokes generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Daily,
    Weekly,
    Monthly,
}

impl ReportKind {
    /// Every recognized kind, in cadence order.
    pub const ALL: [ReportKind; 3] = [ReportKind::Daily, ReportKind::Weekly, ReportKind::Monthly];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Daily => "daily",
            ReportKind::Weekly => "weekly",
            ReportKind::Monthly => "monthly",
        }
    }

    /// Dense index into per-kind tables.
    pub(crate) fn index(&self) -> usize {
        match self {
            ReportKind::Daily => 0,
            ReportKind::Weekly => 1,
            ReportKind::Monthly => 2,
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when text does not name one of the recognized report kinds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid report kind '{0}', expected one of: daily, weekly, monthly")]
pub struct ParseReportKindError(pub String);

impl FromStr for ReportKind {
    type Err = ParseReportKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            _ => Err(ParseReportKindError(s.to_string())),
        }
    }
}

/// Lifecycle of a persisted report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Complete,
    Failed,
}

impl ReportStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReportStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Complete => "complete",
            ReportStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "complete" => Ok(Self::Complete),
            "failed" => Ok(Self::Failed),
            _ => Err(format!(
                "invalid report status '{}', expected one of: pending, complete, failed",
                s
            )),
        }
    }
}

/// The persisted report artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: ReportId,
    pub kind: ReportKind,
    pub window: TimeWindow,
    /// Instant the generation run started.
    pub generated_at: DateTime<Utc>,
    pub status: ReportStatus,
    #[serde(default)]
    pub metrics: Option<ReportMetrics>,
    /// Error summary for failed runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Report {
    /// A freshly started run, observable to readers before any query is issued.
    pub fn pending(kind: ReportKind, window: TimeWindow, generated_at: DateTime<Utc>) -> Self {
        Self {
            id: ReportId::generate(),
            kind,
            window,
            generated_at,
            status: ReportStatus::Pending,
            metrics: None,
            error: None,
            completed_at: None,
        }
    }

    pub fn complete(&mut self, metrics: ReportMetrics, at: DateTime<Utc>) {
        self.status = ReportStatus::Complete;
        self.metrics = Some(metrics);
        self.error = None;
        self.completed_at = Some(at);
    }

    pub fn fail(&mut self, error: impl Into<String>, at: DateTime<Utc>) {
        self.status = ReportStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(at);
    }
}
