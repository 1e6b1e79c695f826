//! Application layer errors.
//!
//! These errors represent failures at the ports and in wiring, not content
//! defects. Content defects are `ValidationError` from `crate::domain`.

use thiserror::Error;

use crate::error::ErrorCategory;

/// Failure reported by a [`ContentService`](crate::application::ports::ContentService).
///
/// `NotFound` is distinguished because the upsert fallback matches on it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The addressed record does not exist.
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// The service answered and refused the request.
    #[error("rejected{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Rejected { status: Option<u16>, message: String },

    /// The service could not be reached.
    #[error("transport failure: {message}")]
    Transport { message: String },
}

impl ServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Failure reported by an [`AssetFetcher`](crate::application::ports::AssetFetcher).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
}

/// Errors that occur while assembling or driving the pipeline.
#[derive(Debug, Error, Clone)]
pub enum ApplicationError {
    /// A service endpoint could not be used.
    #[error("Invalid endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    /// An HTTP client could not be constructed.
    #[error("HTTP client setup failed: {reason}")]
    ClientSetup { reason: String },

    /// The caller-level timeout elapsed before the pipeline finished.
    #[error("Validation did not finish within {seconds}s")]
    PipelineTimeout { seconds: u64 },
}

impl ApplicationError {
    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidEndpoint { url, .. } => vec![
                format!("Check the configured base URL: {url}"),
                "Set service.base_url to an absolute http(s) URL".into(),
            ],
            Self::ClientSetup { .. } => vec!["Check TLS and proxy settings".into()],
            Self::PipelineTimeout { .. } => vec![
                "Increase pipeline.timeout_secs".into(),
                "Or run with --offline to skip network passes".into(),
            ],
        }
    }

    /// Get error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidEndpoint { .. } => ErrorCategory::Configuration,
            Self::ClientSetup { .. } => ErrorCategory::Internal,
            Self::PipelineTimeout { .. } => ErrorCategory::Timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_message_includes_status() {
        let err = ServiceError::Rejected {
            status: Some(422),
            message: "qti-item-body is required".into(),
        };
        assert_eq!(err.to_string(), "rejected (HTTP 422): qti-item-body is required");
        assert!(!err.is_not_found());
    }

    #[test]
    fn not_found_is_distinguished() {
        assert!(
            ServiceError::NotFound {
                resource: "stimulus 'x'".into()
            }
            .is_not_found()
        );
    }
}
