//! Report repository trait.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{Report, ReportId, ReportKind, ReportStatus};

/// Selection of reports for listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilter {
    pub kind: Option<ReportKind>,
    pub status: Option<ReportStatus>,
    /// Maximum number of reports to return
    pub limit: Option<usize>,
}

impl ReportFilter {
    pub fn kind(kind: ReportKind) -> Self {
        Self {
            kind: Some(kind),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: ReportStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, report: &Report) -> bool {
        self.kind.map_or(true, |kind| report.kind == kind)
            && self.status.map_or(true, |status| report.status == status)
    }

    /// Filter, order newest first, and truncate.
    pub(crate) fn apply<I>(&self, reports: I) -> Vec<Report>
    where
        I: IntoIterator<Item = Report>,
    {
        let mut selected: Vec<Report> = reports.into_iter().filter(|r| self.matches(r)).collect();
        selected.sort_by(|a, b| {
            b.generated_at
                .cmp(&a.generated_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}

/// Claim on a report kind held by the store for the length of one run.
///
/// Stores shared between processes hand out a claim that other processes can
/// see; the claim is released when the lock is dropped.
pub struct RunLock {
    _held: Option<Box<dyn Send + Sync>>,
}

impl RunLock {
    /// A lock with nothing to release, for stores private to one process.
    pub fn unshared() -> Self {
        Self { _held: None }
    }

    /// A lock released by dropping `held`.
    pub fn holding(held: impl Send + Sync + 'static) -> Self {
        Self {
            _held: Some(Box::new(held)),
        }
    }
}

impl std::fmt::Debug for RunLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunLock")
            .field("shared", &self._held.is_some())
            .finish()
    }
}

/// Repository trait for report documents.
///
/// Reports are never deleted through this interface; retention is handled by
/// the store's owner.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Check that the store is reachable.
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// Store a new report.
    ///
    /// # Returns
    /// * `Err(RepositoryError::Conflict)` - If a report with the same id exists
    async fn insert_report(&self, report: &Report) -> RepositoryResult<()>;

    /// Replace an existing report.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If no report has this id
    async fn update_report(&self, report: &Report) -> RepositoryResult<()>;

    /// Fetch a report by id.
    async fn get_report(&self, id: ReportId) -> RepositoryResult<Report>;

    /// List reports matching `filter`, newest first.
    async fn list_reports(&self, filter: &ReportFilter) -> RepositoryResult<Vec<Report>>;

    /// Claim `kind` for a generation run across every process using this store.
    ///
    /// Returns `Ok(None)` while another holder has the kind. The default suits
    /// stores that only one process can reach, where the generator's own
    /// in-flight registry already excludes concurrent runs.
    async fn lock_kind(&self, _kind: ReportKind) -> RepositoryResult<Option<RunLock>> {
        Ok(Some(RunLock::unshared()))
    }

    /// Short backend name for health output.
    fn backend_name(&self) -> &'static str;
}
