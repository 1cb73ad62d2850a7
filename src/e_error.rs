//! Error types for compilation checking.
//!
//! `Network`, `Timeout`, `BackendStatus` and `MalformedResponse` describe a
//! single failed backend attempt. The service recovers from them by moving on
//! to the next backend tier; only `NoBackendAvailable` is returned from
//! [`crate::CompilationCheckService::check`].

use thiserror::Error;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, CheckError>;

#[derive(Error, Debug)]
pub enum CheckError {
    /// Connection or DNS failure.
    #[error("network error: {0}")]
    Network(String),

    /// The bounded wait for a backend elapsed.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The backend answered with a non-success HTTP status.
    #[error("backend returned HTTP {status}: {url}")]
    BackendStatus { status: u16, url: String },

    /// The body could not be read as the expected JSON shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Every backend tier failed or was disabled.
    #[error("no backend available: {0}")]
    NoBackendAvailable(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CheckError {
    /// True for failures of a single backend attempt, which the fallback
    /// chain recovers from. Terminal, configuration and I/O errors are not.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CheckError::Network(_)
                | CheckError::Timeout(_)
                | CheckError::BackendStatus { .. }
                | CheckError::MalformedResponse(_)
        )
    }
}

impl From<serde_json::Error> for CheckError {
    fn from(err: serde_json::Error) -> Self {
        CheckError::MalformedResponse(err.to_string())
    }
}

#[cfg(feature = "uses_reqwest")]
impl From<reqwest::Error> for CheckError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown url>".to_string());
        if err.is_timeout() {
            CheckError::Timeout(url)
        } else if let Some(status) = err.status() {
            CheckError::BackendStatus {
                status: status.as_u16(),
                url,
            }
        } else if err.is_decode() {
            CheckError::MalformedResponse(err.to_string())
        } else {
            CheckError::Network(err.to_string())
        }
    }
}
