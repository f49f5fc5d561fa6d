//! HTTP handlers for the REST API.
//!
//! The trigger endpoint only validates and submits; every other endpoint is a
//! read over the report repository.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::header,
    response::{Html, IntoResponse},
    Json,
};

use super::dto::{
    GenerateRequest, GenerateResponse, HealthResponse, LatestQuery, ReportListQuery,
    ReportListResponse,
};
use super::error::AppError;
use super::state::AppState;
use crate::db::services as db_services;
use crate::db::ReportFilter;
use crate::models::{Report, ReportId, ReportKind, ReportStatus};
use crate::services::render;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

const DEFAULT_LIST_LIMIT: usize = 50;
const MAX_LIST_LIMIT: usize = 500;

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
///
/// Verify the service is running and the report store is reachable.
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let backend = state.repository.backend_name();
    let repository = match db_services::health_check(state.repository.as_ref()).await {
        Ok(true) => format!("{backend}: connected"),
        Ok(false) => format!("{backend}: disconnected"),
        Err(e) => format!("{backend}: error: {e}"),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        repository,
        in_flight: state.generator().in_flight().running(),
    }))
}

// =============================================================================
// Generation trigger
// =============================================================================

/// POST /generate
///
/// Validate the requested kind and start a run in the background. The
/// response is sent before the run does any work; its outcome is visible only
/// in the logs and in the stored report.
pub async fn trigger_generation(
    State(state): State<AppState>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> HandlerResult<GenerateResponse> {
    let Json(request) = body?;
    let raw = request
        .report_type
        .ok_or_else(|| AppError::BadRequest("reportType is required".to_string()))?;
    let kind: ReportKind = raw
        .parse()
        .map_err(|e: crate::models::ParseReportKindError| AppError::BadRequest(e.to_string()))?;

    state.dispatcher.submit(kind)?;

    Ok(Json(GenerateResponse {
        message: format!("{kind} report generation started"),
        report_type: kind,
    }))
}

// =============================================================================
// Report reads
// =============================================================================

/// GET /v1/reports?kind=&status=&limit=
///
/// Reports newest first.
pub async fn list_reports(
    State(state): State<AppState>,
    Query(params): Query<ReportListQuery>,
) -> HandlerResult<ReportListResponse> {
    let filter = ReportFilter {
        kind: params.kind.as_deref().map(parse_kind).transpose()?,
        status: params.status.as_deref().map(parse_status).transpose()?,
        limit: Some(params.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT)),
    };

    let reports = db_services::list_reports(state.repository.as_ref(), &filter).await?;
    let total = reports.len();
    Ok(Json(ReportListResponse { reports, total }))
}

/// GET /v1/reports/latest/{kind}?status=
///
/// Newest complete report of a kind, or of any status with `status=any`.
pub async fn get_latest_report(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(params): Query<LatestQuery>,
) -> HandlerResult<Report> {
    let kind = parse_kind(&kind)?;
    let status = match params.status.as_deref() {
        None => Some(ReportStatus::Complete),
        Some(s) if s.eq_ignore_ascii_case("any") => None,
        Some(s) => Some(parse_status(s)?),
    };

    db_services::latest_report(state.repository.as_ref(), kind, status)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no {kind} report available")))
}

/// GET /v1/reports/{id}
pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HandlerResult<Report> {
    load_report(&state, &id).await.map(Json)
}

/// GET /v1/reports/{id}/summary.html
pub async fn get_report_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, AppError> {
    let report = load_report(&state, &id).await?;
    Ok(Html(render::summary_html(&report)))
}

/// GET /v1/reports/{id}/metrics.csv
pub async fn get_report_csv(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let report = load_report(&state, &id).await?;
    let disposition = format!(
        "attachment; filename=\"{}-report-{}.csv\"",
        report.kind,
        report.window.start.format("%Y-%m-%d")
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        render::metrics_csv(&report),
    ))
}

async fn load_report(state: &AppState, id: &str) -> Result<Report, AppError> {
    let report_id: ReportId = id
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid report id '{id}'")))?;
    Ok(state.repository.get_report(report_id).await?)
}

fn parse_kind(raw: &str) -> Result<ReportKind, AppError> {
    raw.parse()
        .map_err(|e: crate::models::ParseReportKindError| AppError::BadRequest(e.to_string()))
}

fn parse_status(raw: &str) -> Result<ReportStatus, AppError> {
    raw.parse().map_err(AppError::BadRequest)
}
