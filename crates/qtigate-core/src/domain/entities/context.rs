use std::fmt;

use tracing::Span;

use crate::domain::{error::ValidationError, value_objects::RootTag};

/// What is being validated, and where diagnostics go.
///
/// Immutable for the duration of one pipeline run. The `span` is the
/// injected logging scope: every pass is instrumented inside it, so callers
/// choose the log sink by choosing the span (and the subscriber behind it).
#[derive(Debug, Clone)]
pub struct ValidationContext {
    id: String,
    root_tag: RootTag,
    title: String,
    span: Span,
    perseus_content: Option<serde_json::Value>,
}

impl ValidationContext {
    /// Create a context with a default `qti_validation` span.
    pub fn new(id: impl Into<String>, root_tag: RootTag, title: impl Into<String>) -> Self {
        let id = id.into();
        let span = tracing::info_span!("qti_validation", id = %id, root = %root_tag);
        Self {
            id,
            root_tag,
            title: title.into(),
            span,
            perseus_content: None,
        }
    }

    /// Log inside the given span instead of the default one.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Attach the authoring-tool source the document was converted from.
    pub fn with_perseus_content(mut self, content: serde_json::Value) -> Self {
        self.perseus_content = Some(content);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn root_tag(&self) -> RootTag {
        self.root_tag
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn perseus_content(&self) -> Option<&serde_json::Value> {
        self.perseus_content.as_ref()
    }

    /// The record identifier must be usable as a URL path segment.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::InvalidContext {
                reason: "context id is empty".into(),
            });
        }
        if self.id.contains(['/', '?', '#']) || self.id.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidContext {
                reason: format!("context id '{}' is not a valid record identifier", self.id),
            });
        }
        Ok(())
    }
}

impl fmt::Display for ValidationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.root_tag, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_identifier() {
        let ctx = ValidationContext::new("item-042", RootTag::Item, "Adding fractions");
        assert!(ctx.validate().is_ok());
        assert_eq!(ctx.to_string(), "item 'item-042'");
    }

    #[test]
    fn rejects_empty_or_path_like_identifier() {
        assert!(
            ValidationContext::new("  ", RootTag::Test, "t")
                .validate()
                .is_err()
        );
        assert!(
            ValidationContext::new("a/b", RootTag::Stimulus, "t")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn carries_opaque_authoring_payload() {
        let ctx = ValidationContext::new("q1", RootTag::Item, "t")
            .with_perseus_content(serde_json::json!({"question": {"content": "[[☃ numeric-input 1]]"}}));
        assert!(ctx.perseus_content().is_some());
    }
}
