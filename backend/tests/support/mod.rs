#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use tokio::sync::{watch, Notify};

use trace_report::config::{GenerationConfig, TempoConfig};
use trace_report::db::{LocalRepository, ReportRepository};
use trace_report::models::{TraceQuery, TraceRecord};
use trace_report::services::{FixedClock, ReportGenerator};
use trace_report::tempo::{TraceQueryClient, TraceQueryError, TraceQueryResult};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// This is panic-safe (restores variables on unwind) and also serializes access to
/// process-global env vars to avoid flaky tests when Rust runs tests in parallel.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

/// Reference instant used by generation tests.
pub fn reference_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 2, 0, 0).unwrap()
}

/// A Tempo search result for one trace.
pub fn trace(id: &str, service: &str, operation: &str, duration_ms: u64) -> TraceRecord {
    json!({
        "traceID": id,
        "rootServiceName": service,
        "rootTraceName": operation,
        "durationMs": duration_ms,
    })
}

/// Serves searches from a callback; counts every call.
pub struct StubClient {
    respond: Box<dyn Fn(usize) -> TraceQueryResult<Vec<TraceRecord>> + Send + Sync>,
    calls: AtomicUsize,
    queries: Mutex<Vec<TraceQuery>>,
}

impl StubClient {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(usize) -> TraceQueryResult<Vec<TraceRecord>> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn returning(records: Vec<TraceRecord>) -> Self {
        Self::new(move |_| Ok(records.clone()))
    }

    pub fn failing_with<F>(make_error: F) -> Self
    where
        F: Fn() -> TraceQueryError + Send + Sync + 'static,
    {
        Self::new(move |_| Err(make_error()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<TraceQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl TraceQueryClient for StubClient {
    async fn get_trace(&self, trace_id: &str) -> TraceQueryResult<TraceRecord> {
        Err(TraceQueryError::NotFound(trace_id.to_string()))
    }

    async fn search_traces(&self, query: &TraceQuery) -> TraceQueryResult<Vec<TraceRecord>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.clone());
        (self.respond)(call)
    }
}

/// Holds every search until [`GatedClient::release`] is called.
pub struct GatedClient {
    pub entered: Notify,
    gate: watch::Sender<bool>,
    calls: AtomicUsize,
}

impl Default for GatedClient {
    fn default() -> Self {
        Self {
            entered: Notify::new(),
            gate: watch::channel(false).0,
            calls: AtomicUsize::new(0),
        }
    }
}

impl GatedClient {
    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TraceQueryClient for GatedClient {
    async fn get_trace(&self, trace_id: &str) -> TraceQueryResult<TraceRecord> {
        Err(TraceQueryError::NotFound(trace_id.to_string()))
    }

    async fn search_traces(&self, _query: &TraceQuery) -> TraceQueryResult<Vec<TraceRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut open = self.gate.subscribe();
        self.entered.notify_one();
        let _ = open.wait_for(|open| *open).await;
        Ok(Vec::new())
    }
}

/// Generator over `client` and `repository`, pinned to [`reference_time`],
/// retrying without delay.
pub fn generator_with(
    client: Arc<dyn TraceQueryClient>,
    repository: Arc<dyn ReportRepository>,
    query_retries: u32,
) -> ReportGenerator {
    let policy = GenerationConfig {
        query_retries,
        retry_delay_ms: 0,
    };
    ReportGenerator::new(client, repository, &TempoConfig::default(), policy)
        .with_clock(Arc::new(FixedClock(reference_time())))
}

/// Generator over `client` with a fresh in-memory repository.
pub fn generator(client: Arc<dyn TraceQueryClient>) -> (ReportGenerator, Arc<LocalRepository>) {
    let repository = Arc::new(LocalRepository::new());
    let generator = generator_with(client, repository.clone(), 0);
    (generator, repository)
}
