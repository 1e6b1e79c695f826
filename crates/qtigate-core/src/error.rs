//! Unified error handling for qtigate Core.
//!
//! Content defects are never errors in this sense: they are collected into
//! a `ValidationResult`. This module covers everything that stops a run
//! from happening at all (wiring, configuration, port failures).

use thiserror::Error;

use crate::application::{ApplicationError, ServiceError};

/// Root error type for qtigate Core operations.
#[derive(Debug, Error, Clone)]
pub enum QtiGateError {
    /// Errors from the application layer (wiring failures).
    #[error("Application error: {0}")]
    Application(#[from] ApplicationError),

    /// The content service failed.
    #[error("Content service error: {0}")]
    Service(#[from] ServiceError),
}

impl QtiGateError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Application(e) => e.suggestions(),
            Self::Service(ServiceError::Transport { .. }) => vec![
                "Check network connectivity".into(),
                "Or run with --offline to skip network passes".into(),
            ],
            Self::Service(_) => vec!["Check service.base_url and service.api_token".into()],
        }
    }

    /// Get error category for display/styling purposes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Application(e) => e.category(),
            Self::Service(ServiceError::NotFound { .. }) => ErrorCategory::NotFound,
            Self::Service(_) => ErrorCategory::Network,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Service(ServiceError::Transport { .. })
                | Self::Application(ApplicationError::PipelineTimeout { .. })
        )
    }
}

/// Error categories for UI display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    NotFound,
    Network,
    Timeout,
    Configuration,
    Internal,
}

/// Convenient result type alias.
pub type QtiGateResult<T> = Result<T, QtiGateError>;
