//! In-memory report repository.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::db::repository::{
    ErrorContext, ReportFilter, ReportRepository, RepositoryError, RepositoryResult,
};
use crate::models::{Report, ReportId};

/// Process-local report store. Contents are lost on exit.
#[derive(Clone, Default)]
pub struct LocalRepository {
    reports: Arc<RwLock<HashMap<ReportId, Report>>>,
}

impl LocalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored reports.
    pub fn len(&self) -> usize {
        self.reports.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.read().is_empty()
    }
}

#[async_trait]
impl ReportRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(true)
    }

    async fn insert_report(&self, report: &Report) -> RepositoryResult<()> {
        let mut reports = self.reports.write();
        if reports.contains_key(&report.id) {
            return Err(RepositoryError::conflict(
                "report already exists",
                ErrorContext::new("insert_report").with_entity_id(report.id),
            ));
        }
        reports.insert(report.id, report.clone());
        Ok(())
    }

    async fn update_report(&self, report: &Report) -> RepositoryResult<()> {
        let mut reports = self.reports.write();
        match reports.get_mut(&report.id) {
            Some(existing) => {
                *existing = report.clone();
                Ok(())
            }
            None => Err(RepositoryError::not_found(
                "report does not exist",
                ErrorContext::new("update_report").with_entity_id(report.id),
            )),
        }
    }

    async fn get_report(&self, id: ReportId) -> RepositoryResult<Report> {
        self.reports.read().get(&id).cloned().ok_or_else(|| {
            RepositoryError::not_found(
                format!("report {} not found", id),
                ErrorContext::new("get_report").with_entity_id(id),
            )
        })
    }

    async fn list_reports(&self, filter: &ReportFilter) -> RepositoryResult<Vec<Report>> {
        let snapshot: Vec<Report> = self.reports.read().values().cloned().collect();
        Ok(filter.apply(snapshot))
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}
