//! Error taxonomy for the extraction pipeline
//!
//! Everything below the orchestrator signals a phase-scoped failure; the
//! orchestrator downgrades these to `RecordedError` entries on the result
//! document instead of failing the whole call.

use thiserror::Error;

/// Failures on the retrieval paths (static HTTP or browser render launch).
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid URL '{0}': {1}")]
    InvalidUrl(String, String),

    #[error("Request failed: {0}")]
    Network(String),

    #[error("Non-success status code: {0}")]
    Status(u16),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Browser render failed: {0}")]
    Render(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(0)
        } else if let Some(status) = err.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}
