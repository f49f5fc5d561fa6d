//! Report generation controller.
//!
//! One call to [`ReportGenerator::generate_report`] is one generation run:
//!
//! ```text
//! parse kind ──► claim kind ──► resolve window ──► insert pending report
//!                                                        │
//!            complete ◄── aggregate ◄── search traces ◄──┘
//!                 │              │             │
//!                 ▼              ▼             ▼
//!             (update)        failed        failed
//! ```
//!
//! The per-kind claim is an [`InFlightGuard`] plus the repository's
//! [`RunLock`](crate::db::RunLock), both held for the whole run and released
//! when they go out of scope. A report that was stored as pending always ends
//! complete or failed unless the store itself is unreachable.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use super::aggregator::{aggregate, AggregationError};
use super::in_flight::{InFlightGuard, InFlightRegistry};
use crate::config::{GenerationConfig, TempoConfig};
use crate::db::{ReportRepository, RepositoryError};
use crate::models::{ParseReportKindError, Report, ReportKind, TimeWindow, TraceQuery, TraceRecord};
use crate::tempo::{TraceQueryClient, TraceQueryError, TraceQueryResult};

/// Source of "now" for window resolution.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error(transparent)]
    InvalidKind(#[from] ParseReportKindError),

    #[error("a {0} report is already being generated")]
    AlreadyRunning(ReportKind),

    #[error("trace query failed: {0}")]
    QueryFailed(#[source] TraceQueryError),

    #[error("report aggregation failed: {0}")]
    AggregationFailed(#[source] AggregationError),

    #[error("report storage failed: {0}")]
    Storage(#[source] RepositoryError),
}

impl GenerationError {
    /// True for errors caused by the caller's input rather than the run.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::InvalidKind(_))
    }
}

/// Orchestrates generation runs. Cheap to share behind an `Arc`.
pub struct ReportGenerator {
    client: Arc<dyn TraceQueryClient>,
    repository: Arc<dyn ReportRepository>,
    in_flight: InFlightRegistry,
    clock: Arc<dyn Clock>,
    search_query: Option<String>,
    search_limit: Option<u32>,
    policy: GenerationConfig,
}

impl ReportGenerator {
    pub fn new(
        client: Arc<dyn TraceQueryClient>,
        repository: Arc<dyn ReportRepository>,
        tempo: &TempoConfig,
        policy: GenerationConfig,
    ) -> Self {
        Self {
            client,
            repository,
            in_flight: InFlightRegistry::new(),
            clock: Arc::new(SystemClock),
            search_query: tempo.search_query.clone(),
            search_limit: tempo.search_limit,
            policy,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn in_flight(&self) -> &InFlightRegistry {
        &self.in_flight
    }

    pub fn repository(&self) -> &Arc<dyn ReportRepository> {
        &self.repository
    }

    /// Run generation for a kind given as text.
    ///
    /// An unrecognized kind fails before any state is created or any query is
    /// issued.
    pub async fn generate_report(&self, kind: &str) -> Result<Report, GenerationError> {
        let kind: ReportKind = kind.parse()?;
        self.generate(kind).await
    }

    /// Run generation for `kind`, with the window resolved from the clock.
    pub async fn generate(&self, kind: ReportKind) -> Result<Report, GenerationError> {
        let started_at = self.clock.now();
        let guard = self
            .in_flight
            .try_acquire(kind, started_at)
            .ok_or(GenerationError::AlreadyRunning(kind))?;
        // held alongside the guard so runs in other processes sharing the store
        // are excluded too
        let _store_lock = self
            .repository
            .lock_kind(kind)
            .await
            .map_err(GenerationError::Storage)?
            .ok_or(GenerationError::AlreadyRunning(kind))?;

        self.run(&guard).await
    }

    async fn run(&self, guard: &InFlightGuard) -> Result<Report, GenerationError> {
        let kind = guard.run().kind;
        let started_at = guard.run().started_at;
        let window = TimeWindow::for_kind(kind, started_at);

        let mut report = Report::pending(kind, window, started_at);
        self.repository
            .insert_report(&report)
            .await
            .map_err(GenerationError::Storage)?;
        info!(
            report_id = %report.id,
            %kind,
            window_start = %window.start,
            window_end = %window.end,
            "report generation started"
        );

        let query = TraceQuery {
            query: self.search_query.clone(),
            ..TraceQuery::default()
        }
        .within(&window)
        .with_limit(self.search_limit);

        let records = match self.search_with_retry(&query).await {
            Ok(records) => records,
            Err(err) => {
                let err = GenerationError::QueryFailed(err);
                self.mark_failed(&mut report, &err).await;
                return Err(err);
            }
        };

        let metrics = match aggregate(kind, &window, &records) {
            Ok(metrics) => metrics,
            Err(err) => {
                let err = GenerationError::AggregationFailed(err);
                self.mark_failed(&mut report, &err).await;
                return Err(err);
            }
        };
        if metrics.skipped > 0 {
            warn!(report_id = %report.id, skipped = metrics.skipped, "skipped malformed trace records");
        }

        let mut completed = report.clone();
        completed.complete(metrics, self.clock.now());
        if let Err(err) = self.repository.update_report(&completed).await {
            let err = GenerationError::Storage(err);
            self.mark_failed(&mut report, &err).await;
            return Err(err);
        }
        let report = completed;

        info!(
            report_id = %report.id,
            %kind,
            traces = records.len(),
            "report generation complete"
        );
        Ok(report)
    }

    async fn search_with_retry(&self, query: &TraceQuery) -> TraceQueryResult<Vec<TraceRecord>> {
        let mut attempt = 0;
        loop {
            match self.client.search_traces(query).await {
                Ok(records) => return Ok(records),
                Err(err) if err.is_retryable() && attempt < self.policy.query_retries => {
                    attempt += 1;
                    warn!(
                        attempt,
                        max_retries = self.policy.query_retries,
                        error = %err,
                        "trace search failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(self.policy.retry_delay_ms)).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Best effort: the run's own error is what the caller sees.
    async fn mark_failed(&self, report: &mut Report, err: &GenerationError) {
        error!(report_id = %report.id, kind = %report.kind, error = %err, "report generation failed");
        report.fail(err.to_string(), self.clock.now());
        if let Err(store_err) = self.repository.update_report(report).await {
            error!(report_id = %report.id, error = %store_err, "failed to persist failed report status");
        }
    }
}
