use serde::Serialize;

use crate::domain::error::{ErrorCategory, ValidationError};

/// Outcome of one pipeline run.
///
/// Invariant: `is_valid()` holds iff `errors()` is empty. The document is
/// echoed back untouched; the pipeline never repairs content.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
    xml: String,
}

impl ValidationResult {
    pub fn new(errors: Vec<ValidationError>, xml: impl Into<String>) -> Self {
        Self {
            errors,
            xml: xml.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn xml(&self) -> &str {
        &self.xml
    }

    /// Serializable view of every error, in pipeline order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.errors.iter().map(Diagnostic::from).collect()
    }
}

/// Flattened, serializable form of a [`ValidationError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub category: ErrorCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl From<&ValidationError> for Diagnostic {
    fn from(err: &ValidationError) -> Self {
        Self {
            category: err.category(),
            message: err.to_string(),
            context: err.context().map(str::to_owned),
            suggestion: err.suggestion(),
        }
    }
}
