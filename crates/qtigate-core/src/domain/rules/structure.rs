//! Document-shape rules: root element, title, truncation, legacy artifacts.

use regex::Regex;

use crate::domain::{
    entities::ValidationContext,
    error::ValidationError,
    markup::{attribute, opening_tag_attributes, snippet, static_regex},
    value_objects::RootTag,
};

/// Declaration, one root element, nothing before or after.
fn root_shape(root: RootTag) -> &'static Regex {
    match root {
        RootTag::Item => static_regex!(
            r"\A<\?xml[^>]*\?>\s*<qti-assessment-item\b[^>]*>[\s\S]*</qti-assessment-item>\z"
        ),
        RootTag::Test => static_regex!(
            r"\A<\?xml[^>]*\?>\s*<qti-assessment-test\b[^>]*>[\s\S]*</qti-assessment-test>\z"
        ),
        RootTag::Stimulus => static_regex!(
            r"\A<\?xml[^>]*\?>\s*<qti-assessment-stimulus\b[^>]*>[\s\S]*</qti-assessment-stimulus>\z"
        ),
    }
}

/// The trimmed document must be an XML declaration followed by one root element.
pub fn check_root_element(xml: &str, ctx: &ValidationContext) -> Result<(), ValidationError> {
    let root_tag = ctx.root_tag();
    if root_shape(root_tag).is_match(xml.trim()) {
        Ok(())
    } else {
        Err(ValidationError::MissingRootElement {
            root: root_tag.element_name(),
        })
    }
}

/// The root opening tag must carry a non-empty `title`.
///
/// A document without a recognisable root is left to [`check_root_element`].
pub fn check_title_attribute(xml: &str, ctx: &ValidationContext) -> Result<(), ValidationError> {
    let root = ctx.root_tag().element_name();
    let Some(attrs) = opening_tag_attributes(xml, root) else {
        return Ok(());
    };
    match attribute(attrs, "title") {
        None => Err(ValidationError::MissingTitle { root }),
        Some(title) if title.trim().is_empty() => Err(ValidationError::EmptyTitle { root }),
        Some(_) => Ok(()),
    }
}

/// Closing-tag fragments such as `</_`, `</ >` or `</...` left by truncation.
pub fn check_truncated_tags(xml: &str, _ctx: &ValidationContext) -> Result<(), ValidationError> {
    let re = static_regex!(r"</(?:_|\s+>|\.\.\.)");
    match re.find(xml) {
        Some(m) => Err(ValidationError::TruncatedTag {
            fragment: m.as_str().to_string(),
            context: snippet(xml, m.start(), m.end()),
        }),
        None => Ok(()),
    }
}

/// Leftover `[[☃ widget]]` placeholders from the legacy authoring tool.
pub fn check_perseus_artifacts(xml: &str, _ctx: &ValidationContext) -> Result<(), ValidationError> {
    let re = static_regex!(r"\[\[\x{2603}[^\]]*\]\]");
    match re.find(xml) {
        Some(m) => Err(ValidationError::PerseusArtifact {
            artifact: m.as_str().to_string(),
            context: snippet(xml, m.start(), m.end()),
        }),
        None => Ok(()),
    }
}
