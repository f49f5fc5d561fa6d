//! Data Transfer Objects for the HTTP API.
//!
//! Reports themselves are served as their persisted form
//! ([`crate::models::Report`]); the types here cover requests and envelopes.

use serde::{Deserialize, Serialize};

use crate::models::{Report, ReportKind};

/// Body of `POST /generate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// `daily`, `weekly` or `monthly`, case-insensitive
    #[serde(default)]
    pub report_type: Option<String>,
}

/// Acknowledgement that a run was submitted. Says nothing about its outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub message: String,
    pub report_type: ReportKind,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Repository backend and reachability, e.g. `file: connected`
    pub repository: String,
    /// Kinds with a generation run in progress
    pub in_flight: Vec<ReportKind>,
}

/// Query parameters of `GET /v1/reports`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportListQuery {
    pub kind: Option<String>,
    pub status: Option<String>,
    pub limit: Option<usize>,
}

/// Response of `GET /v1/reports`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportListResponse {
    pub reports: Vec<Report>,
    pub total: usize,
}

/// Query parameters of `GET /v1/reports/latest/{kind}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatestQuery {
    /// Status to match; `complete` when omitted, `any` for no restriction
    pub status: Option<String>,
}
