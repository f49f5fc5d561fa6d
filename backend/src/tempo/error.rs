//! Normalized trace backend errors.

/// Result type for trace backend calls
pub type TraceQueryResult<T> = Result<T, TraceQueryError>;

#[derive(Debug, thiserror::Error)]
pub enum TraceQueryError {
    /// The backend has no trace with the requested id.
    #[error("trace '{0}' not found")]
    NotFound(String),

    /// Connection failure or a 5xx response.
    #[error("trace backend unavailable: {0}")]
    Unavailable(String),

    /// No response within the configured deadline.
    #[error("trace backend did not respond within {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// Any other non-success status.
    #[error("trace backend rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// The response body was not the JSON we expect.
    #[error("invalid response from trace backend: {0}")]
    InvalidResponse(String),

    #[error("invalid trace backend configuration: {0}")]
    Configuration(String),
}

impl TraceQueryError {
    /// Transient failures a caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout { .. })
    }

    /// Map a non-success HTTP status to an error.
    pub(crate) fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        if status.is_server_error() {
            Self::Unavailable(format!("{}: {}", status, body))
        } else {
            Self::Rejected {
                status: status.as_u16(),
                body,
            }
        }
    }
}
