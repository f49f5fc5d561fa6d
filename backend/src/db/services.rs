//! Report read helpers shared by the HTTP layer and the scheduled entry point.

use super::repository::{ReportFilter, ReportRepository, RepositoryResult};
use crate::models::{Report, ReportKind, ReportStatus};

/// Check if the repository is reachable.
pub async fn health_check(repo: &dyn ReportRepository) -> RepositoryResult<bool> {
    repo.health_check().await
}

/// Newest report of `kind`, optionally restricted to one status.
pub async fn latest_report(
    repo: &dyn ReportRepository,
    kind: ReportKind,
    status: Option<ReportStatus>,
) -> RepositoryResult<Option<Report>> {
    let mut filter = ReportFilter::kind(kind).with_limit(1);
    filter.status = status;
    Ok(repo.list_reports(&filter).await?.into_iter().next())
}

/// Reports matching `filter`, newest first.
pub async fn list_reports(
    repo: &dyn ReportRepository,
    filter: &ReportFilter,
) -> RepositoryResult<Vec<Report>> {
    repo.list_reports(filter).await
}
