//! End-to-end generation runs against in-process trace backends.

mod support;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;

use support::{generator, generator_with, reference_time, trace, GatedClient, StubClient};
use trace_report::db::{FileRepository, ReportFilter, ReportRepository};
use trace_report::models::{ReportKind, ReportMetrics, ReportStatus, TimeWindow};
use trace_report::services::{GenerationError, ReportGenerator};
use trace_report::tempo::{TraceQueryClient, TraceQueryError, TraceQueryResult};

async fn wait_for_calls(calls: impl Fn() -> usize, expected: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while calls() < expected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("client was never called");
}

#[tokio::test]
async fn test_zero_records_complete_with_zero_metrics_for_every_kind() {
    for kind in ReportKind::ALL {
        let client = Arc::new(StubClient::returning(Vec::new()));
        let (generator, repo) = generator(client.clone());

        let report = generator.generate_report(kind.as_str()).await.unwrap();

        assert_eq!(report.kind, kind);
        assert_eq!(report.status, ReportStatus::Complete);
        assert_eq!(report.metrics, Some(ReportMetrics::default()));
        assert_eq!(report.window, TimeWindow::for_kind(kind, reference_time()));
        assert_eq!(client.calls(), 1);

        let stored = repo.get_report(report.id).await.unwrap();
        assert_eq!(stored, report);
    }
}

#[tokio::test]
async fn test_concurrent_same_kind_run_is_rejected_without_side_effects() {
    let client = Arc::new(GatedClient::default());
    let (generator, repo) = generator(client.clone());
    let generator = Arc::new(generator);

    let first = tokio::spawn({
        let generator = Arc::clone(&generator);
        async move { generator.generate(ReportKind::Daily).await }
    });
    client.entered.notified().await;

    let second = generator.generate_report("daily").await;
    assert!(matches!(second, Err(GenerationError::AlreadyRunning(ReportKind::Daily))));
    assert_eq!(client.calls(), 1);
    // only the first run's pending report exists
    assert_eq!(repo.len(), 1);

    client.release();
    let report = first.await.unwrap().unwrap();
    assert_eq!(report.status, ReportStatus::Complete);
    assert!(!generator.in_flight().is_running(ReportKind::Daily));

    let reports = repo.list_reports(&ReportFilter::default()).await.unwrap();
    assert_eq!(reports.len(), 1);
}

#[tokio::test]
async fn test_different_kinds_run_concurrently() {
    let client = Arc::new(GatedClient::default());
    let (generator, repo) = generator(client.clone());
    let generator = Arc::new(generator);

    let runs: Vec<_> = [ReportKind::Daily, ReportKind::Monthly]
        .into_iter()
        .map(|kind| {
            let generator = Arc::clone(&generator);
            tokio::spawn(async move { generator.generate(kind).await })
        })
        .collect();

    let probe = Arc::clone(&client);
    wait_for_calls(move || probe.calls(), 2).await;
    assert_eq!(
        generator.in_flight().running(),
        vec![ReportKind::Daily, ReportKind::Monthly]
    );

    client.release();
    for run in runs {
        assert_eq!(run.await.unwrap().unwrap().status, ReportStatus::Complete);
    }
    assert!(generator.in_flight().running().is_empty());
    assert_eq!(repo.len(), 2);
}

#[tokio::test]
async fn test_marker_released_after_failure() {
    let client = Arc::new(StubClient::failing_with(|| {
        TraceQueryError::Unavailable("connection refused".to_string())
    }));
    let (generator, repo) = generator(client.clone());

    let err = generator.generate(ReportKind::Weekly).await.unwrap_err();
    assert!(matches!(err, GenerationError::QueryFailed(TraceQueryError::Unavailable(_))));
    assert!(!generator.in_flight().is_running(ReportKind::Weekly));

    // a second run reaches the backend instead of being rejected
    let err = generator.generate(ReportKind::Weekly).await.unwrap_err();
    assert!(matches!(err, GenerationError::QueryFailed(_)));
    assert_eq!(client.calls(), 2);

    let failed = repo
        .list_reports(&ReportFilter::kind(ReportKind::Weekly))
        .await
        .unwrap();
    assert_eq!(failed.len(), 2);
    for report in failed {
        assert_eq!(report.status, ReportStatus::Failed);
        assert!(report.error.unwrap().contains("connection refused"));
        assert!(report.metrics.is_none());
    }
}

#[tokio::test]
async fn test_marker_released_after_success() {
    let client = Arc::new(StubClient::returning(vec![trace("t1", "svc", "op", 10)]));
    let (generator, _repo) = generator(client.clone());

    generator.generate(ReportKind::Monthly).await.unwrap();
    generator.generate(ReportKind::Monthly).await.unwrap();
    assert_eq!(client.calls(), 2);
    assert!(!generator.in_flight().is_running(ReportKind::Monthly));
}

struct PanickingClient;

#[async_trait::async_trait]
impl TraceQueryClient for PanickingClient {
    async fn get_trace(&self, _trace_id: &str) -> TraceQueryResult<serde_json::Value> {
        panic!("unexpected get_trace");
    }

    async fn search_traces(
        &self,
        _query: &trace_report::models::TraceQuery,
    ) -> TraceQueryResult<Vec<serde_json::Value>> {
        panic!("backend client crashed");
    }
}

#[tokio::test]
async fn test_marker_released_when_run_panics() {
    let (generator, _repo) = generator(Arc::new(PanickingClient));
    let generator = Arc::new(generator);

    let run = tokio::spawn({
        let generator = Arc::clone(&generator);
        async move { generator.generate(ReportKind::Daily).await }
    });
    assert!(run.await.unwrap_err().is_panic());
    assert!(!generator.in_flight().is_running(ReportKind::Daily));
}

#[tokio::test]
async fn test_invalid_kind_makes_no_client_calls() {
    let client = Arc::new(StubClient::returning(Vec::new()));
    let (generator, repo) = generator(client.clone());

    for kind in ["yearly", "", "DAILYY"] {
        let err = generator.generate_report(kind).await.unwrap_err();
        assert!(matches!(err, GenerationError::InvalidKind(_)));
    }
    assert_eq!(client.calls(), 0);
    assert!(repo.is_empty());
    assert!(generator.in_flight().running().is_empty());
}

#[tokio::test]
async fn test_malformed_record_among_valid_ones_is_skipped() {
    let mut records: Vec<_> = (1..=4)
        .map(|i| trace(&format!("t{i}"), "notice-service", "GET /api/notices", i * 10))
        .collect();
    records.push(json!({ "rootServiceName": "no-id" }));

    let (generator, _repo) = generator(Arc::new(StubClient::returning(records)));
    let report = generator.generate(ReportKind::Daily).await.unwrap();

    let metrics = report.metrics.unwrap();
    assert_eq!(metrics.total_traces, 4);
    assert_eq!(metrics.skipped, 1);
    assert_eq!(metrics.latency.unwrap().max_ms, 40);
}

#[tokio::test]
async fn test_all_malformed_records_fail_the_run() {
    let records = vec![json!(42), json!({ "traceID": null })];
    let (generator, repo) = generator(Arc::new(StubClient::returning(records)));

    let err = generator.generate(ReportKind::Daily).await.unwrap_err();
    assert!(matches!(err, GenerationError::AggregationFailed(_)));

    let reports = repo.list_reports(&ReportFilter::default()).await.unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].status, ReportStatus::Failed);
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let client = Arc::new(StubClient::new(|call| match call {
        0 => Err(TraceQueryError::Timeout { timeout_ms: 30_000 }),
        1 => Err(TraceQueryError::Unavailable("502 Bad Gateway".to_string())),
        _ => Ok(vec![trace("t1", "svc", "op", 5)]),
    }));
    let repo = Arc::new(trace_report::db::LocalRepository::new());
    let generator = generator_with(client.clone(), repo, 2);

    let report = generator.generate(ReportKind::Daily).await.unwrap();
    assert_eq!(report.metrics.unwrap().total_traces, 1);
    assert_eq!(client.calls(), 3);
}

#[tokio::test]
async fn test_query_is_bounded_by_the_window() {
    let client = Arc::new(StubClient::returning(Vec::new()));
    let (generator, _repo) = generator(client.clone());

    generator.generate(ReportKind::Weekly).await.unwrap();

    let queries = client.queries();
    let window = TimeWindow::for_kind(ReportKind::Weekly, reference_time());
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].start, Some(window.start));
    assert_eq!(queries[0].end, Some(window.end));
    assert_eq!(
        window.start.to_rfc3339(),
        "2024-03-08T00:00:00+00:00",
        "weekly window ending on the reference day"
    );
}

#[tokio::test]
async fn test_reports_persist_across_repository_instances() {
    let dir = TempDir::new().unwrap();
    let client = Arc::new(StubClient::returning(vec![trace("t1", "svc", "op", 12)]));

    let repo = Arc::new(FileRepository::open(dir.path()).await.unwrap());
    let generator: ReportGenerator = generator_with(client, repo, 0);
    let report = generator.generate(ReportKind::Daily).await.unwrap();
    drop(generator);

    let reopened = FileRepository::open(dir.path()).await.unwrap();
    let stored = reopened.get_report(report.id).await.unwrap();
    assert_eq!(stored.status, ReportStatus::Complete);
    assert_eq!(stored.metrics.unwrap().total_traces, 1);
}

#[tokio::test]
async fn test_generators_sharing_a_file_store_exclude_each_other() {
    let dir = TempDir::new().unwrap();
    let client = Arc::new(GatedClient::default());

    // two generators stand in for the server and the scheduled binary
    let server = Arc::new(generator_with(
        client.clone(),
        Arc::new(FileRepository::open(dir.path()).await.unwrap()),
        0,
    ));
    let scheduled = generator_with(
        client.clone(),
        Arc::new(FileRepository::open(dir.path()).await.unwrap()),
        0,
    );

    let first = tokio::spawn({
        let server = Arc::clone(&server);
        async move { server.generate(ReportKind::Daily).await }
    });
    client.entered.notified().await;

    let second = scheduled.generate(ReportKind::Daily).await;
    assert!(matches!(second, Err(GenerationError::AlreadyRunning(ReportKind::Daily))));
    assert_eq!(client.calls(), 1);

    client.release();
    assert_eq!(first.await.unwrap().unwrap().status, ReportStatus::Complete);
    assert!(!dir.path().join(".daily.lock").exists());

    let reopened = FileRepository::open(dir.path()).await.unwrap();
    let daily = reopened
        .list_reports(&ReportFilter::kind(ReportKind::Daily))
        .await
        .unwrap();
    assert_eq!(daily.len(), 1);

    // the claim is gone once the first run ends
    let report = scheduled.generate(ReportKind::Daily).await.unwrap();
    assert_eq!(report.status, ReportStatus::Complete);
    assert_eq!(client.calls(), 2);
}
