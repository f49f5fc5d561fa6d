//! Fire-and-forget execution of generation runs.
//!
//! The HTTP trigger must answer before the run finishes, so it hands the kind
//! to a [`RunDispatcher`], which spawns the run on the tokio runtime and
//! reports the outcome to a [`RunSink`]. Callers never receive a handle.

use std::sync::Arc;

use chrono::Utc;
use tokio::runtime::Handle;
use tracing::{error, info, warn, Instrument};

use super::generator::{GenerationError, ReportGenerator};
use crate::models::{Report, ReportKind};

/// Receives the outcome of every dispatched run.
pub trait RunSink: Send + Sync {
    fn record(&self, kind: ReportKind, outcome: &Result<Report, GenerationError>);
}

/// Default sink: one structured log line per run.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl RunSink for LogSink {
    fn record(&self, kind: ReportKind, outcome: &Result<Report, GenerationError>) {
        match outcome {
            Ok(report) => info!(
                %kind,
                report_id = %report.id,
                status = ?report.status,
                "dispatched run finished"
            ),
            Err(GenerationError::AlreadyRunning(_)) => {
                warn!(%kind, "dispatched run skipped, generation already in progress")
            }
            Err(err) => error!(%kind, error = %err, "dispatched run failed"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no async runtime available to run report generation")]
    NoRuntime,
}

/// Submits generation runs as detached tasks.
#[derive(Clone)]
pub struct RunDispatcher {
    generator: Arc<ReportGenerator>,
    sink: Arc<dyn RunSink>,
}

impl RunDispatcher {
    pub fn new(generator: Arc<ReportGenerator>) -> Self {
        Self::with_sink(generator, Arc::new(LogSink))
    }

    pub fn with_sink(generator: Arc<ReportGenerator>, sink: Arc<dyn RunSink>) -> Self {
        Self { generator, sink }
    }

    pub fn generator(&self) -> &Arc<ReportGenerator> {
        &self.generator
    }

    /// Start a run for `kind` and return without waiting for it.
    ///
    /// Fails only if the calling thread is not inside a tokio runtime.
    pub fn submit(&self, kind: ReportKind) -> Result<(), DispatchError> {
        let handle = Handle::try_current().map_err(|_| DispatchError::NoRuntime)?;
        let generator = Arc::clone(&self.generator);
        let sink = Arc::clone(&self.sink);
        let span = tracing::info_span!("report_run", %kind, submitted_at = %Utc::now());

        handle.spawn(
            async move {
                let outcome = generator.generate(kind).await;
                sink.record(kind, &outcome);
            }
            .instrument(span),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GenerationConfig, TempoConfig};
    use crate::db::LocalRepository;
    use crate::models::ReportStatus;
    use crate::tempo::{TraceQueryClient, TraceQueryError, TraceQueryResult};
    use crate::models::{TraceQuery, TraceRecord};
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    struct EmptyClient;

    #[async_trait]
    impl TraceQueryClient for EmptyClient {
        async fn get_trace(&self, trace_id: &str) -> TraceQueryResult<TraceRecord> {
            Err(TraceQueryError::NotFound(trace_id.to_string()))
        }

        async fn search_traces(&self, _query: &TraceQuery) -> TraceQueryResult<Vec<TraceRecord>> {
            Ok(Vec::new())
        }
    }

    struct ChannelSink(mpsc::UnboundedSender<(ReportKind, Option<ReportStatus>)>);

    impl RunSink for ChannelSink {
        fn record(&self, kind: ReportKind, outcome: &Result<Report, GenerationError>) {
            let status = outcome.as_ref().ok().map(|r| r.status);
            let _ = self.0.send((kind, status));
        }
    }

    fn generator() -> Arc<ReportGenerator> {
        Arc::new(ReportGenerator::new(
            Arc::new(EmptyClient),
            Arc::new(LocalRepository::new()),
            &TempoConfig::default(),
            GenerationConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_submit_reports_outcome_to_sink() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatcher = RunDispatcher::with_sink(generator(), Arc::new(ChannelSink(tx)));

        dispatcher.submit(ReportKind::Weekly).unwrap();

        let (kind, status) = rx.recv().await.unwrap();
        assert_eq!(kind, ReportKind::Weekly);
        assert_eq!(status, Some(ReportStatus::Complete));
        assert!(!dispatcher.generator().in_flight().is_running(ReportKind::Weekly));
    }

    #[test]
    fn test_submit_outside_runtime_fails() {
        let dispatcher = RunDispatcher::new(generator());
        assert!(matches!(
            dispatcher.submit(ReportKind::Daily),
            Err(DispatchError::NoRuntime)
        ));
    }
}
