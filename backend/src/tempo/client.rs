//! HTTP client for the trace backend query API.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use super::error::{TraceQueryError, TraceQueryResult};
use crate::config::TempoConfig;
use crate::models::{TraceQuery, TraceRecord};

/// Point and range queries against a trace backend.
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; one instance is shared by every
/// generation run.
#[async_trait]
pub trait TraceQueryClient: Send + Sync {
    /// Fetch one trace by identifier.
    async fn get_trace(&self, trace_id: &str) -> TraceQueryResult<TraceRecord>;

    /// Fetch every trace matching `query` within its bounds.
    ///
    /// Zero matches is an empty vector, not an error.
    async fn search_traces(&self, query: &TraceQuery) -> TraceQueryResult<Vec<TraceRecord>>;
}

/// Body of `GET /api/search`.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    traces: Option<Vec<TraceRecord>>,
}

/// [`TraceQueryClient`] over the Tempo HTTP API.
pub struct TempoClient {
    http: Client,
    base_url: Url,
    config: TempoConfig,
}

impl TempoClient {
    /// Create a client from configuration.
    ///
    /// Fails if the backend URL does not parse or the HTTP client cannot be
    /// built.
    pub fn new(config: TempoConfig) -> TraceQueryResult<Self> {
        let base_url = Url::parse(config.backend_url.trim_end_matches('/')).map_err(|e| {
            TraceQueryError::Configuration(format!("invalid backend_url '{}': {}", config.backend_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(TraceQueryError::Configuration(format!(
                "backend_url '{}' cannot be used as a base URL",
                config.backend_url
            )));
        }

        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| TraceQueryError::Configuration(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            config,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> TraceQueryResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TraceQueryError::Configuration("backend_url cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Query string for a search issued at `now`.
    pub(crate) fn search_params(&self, query: &TraceQuery, now: DateTime<Utc>) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(q) = &query.query {
            params.push(("q", q.clone()));
        }

        let (start, end) = match (query.start, query.end, self.config.default_lookback_secs) {
            (None, None, Some(lookback)) => {
                let start = i64::try_from(lookback)
                    .ok()
                    .and_then(chrono::Duration::try_seconds)
                    .and_then(|lookback| now.checked_sub_signed(lookback));
                (start, Some(now))
            }
            (start, end, _) => (start, end),
        };
        if let Some(start) = start {
            params.push(("start", start.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        if let Some(end) = end {
            params.push(("end", end.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }
        params
    }

    fn classify(&self, err: reqwest::Error) -> TraceQueryError {
        if err.is_timeout() {
            TraceQueryError::Timeout {
                timeout_ms: self.config.timeout_ms,
            }
        } else if err.is_decode() {
            TraceQueryError::InvalidResponse(err.to_string())
        } else {
            TraceQueryError::Unavailable(err.to_string())
        }
    }

    async fn failure(&self, response: Response) -> TraceQueryError {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        TraceQueryError::from_status(status, body)
    }
}

#[async_trait]
impl TraceQueryClient for TempoClient {
    async fn get_trace(&self, trace_id: &str) -> TraceQueryResult<TraceRecord> {
        let url = self.endpoint(&["api", "traces", trace_id])?;
        debug!(%url, trace_id, "fetching trace");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(TraceQueryError::NotFound(trace_id.to_string()));
        }
        if !response.status().is_success() {
            let err = self.failure(response).await;
            warn!(trace_id, error = %err, "trace lookup failed");
            return Err(err);
        }

        response.json::<TraceRecord>().await.map_err(|e| self.classify(e))
    }

    async fn search_traces(&self, query: &TraceQuery) -> TraceQueryResult<Vec<TraceRecord>> {
        let url = self.endpoint(&["api", "search"])?;
        let params = self.search_params(query, Utc::now());
        debug!(%url, ?params, "searching traces");

        let response = self
            .http
            .get(url)
            .query(&params)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            let err = self.failure(response).await;
            warn!(error = %err, "trace search failed");
            return Err(err);
        }

        let body: SearchResponse = response.json().await.map_err(|e| self.classify(e))?;
        let traces = body.traces.unwrap_or_default();
        debug!(count = traces.len(), "trace search returned");
        Ok(traces)
    }
}
