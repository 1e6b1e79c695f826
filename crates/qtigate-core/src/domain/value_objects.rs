//! Domain value objects: RootTag and the interaction tag set.
//!
//! # Design
//!
//! These are pure value types. `Copy`, equality-by-value, no identity.
//! They define the closed vocabularies the content rules reason about and
//! their string representations.

use crate::domain::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix shared by every QTI 3 element name.
pub const QTI_PREFIX: &str = "qti-";

// ── RootTag ──────────────────────────────────────────────────────────────────

/// The kind of QTI document under validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RootTag {
    Item,
    Test,
    Stimulus,
}

impl RootTag {
    pub const ALL: [RootTag; 3] = [Self::Item, Self::Test, Self::Stimulus];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Item => "item",
            Self::Test => "test",
            Self::Stimulus => "stimulus",
        }
    }

    /// The element name of the document root, e.g. `qti-assessment-item`.
    pub const fn element_name(&self) -> &'static str {
        match self {
            Self::Item => "qti-assessment-item",
            Self::Test => "qti-assessment-test",
            Self::Stimulus => "qti-assessment-stimulus",
        }
    }

    /// Infer the root tag from a document by looking for the first root
    /// element opening.
    pub fn detect(xml: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .filter_map(|tag| {
                let needle = format!("<{}", tag.element_name());
                xml.match_indices(&needle)
                    .find(|(pos, _)| {
                        xml[pos + needle.len()..]
                            .chars()
                            .next()
                            .is_some_and(|c| c.is_whitespace() || c == '>' || c == '/')
                    })
                    .map(|(pos, _)| (pos, tag))
            })
            .min_by_key(|(pos, _)| *pos)
            .map(|(_, tag)| tag)
    }
}

impl fmt::Display for RootTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RootTag {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "item" | "qti-assessment-item" => Ok(Self::Item),
            "test" | "qti-assessment-test" => Ok(Self::Test),
            "stimulus" | "qti-assessment-stimulus" => Ok(Self::Stimulus),
            other => Err(ValidationError::InvalidContext {
                reason: format!("unknown root tag: {other}"),
            }),
        }
    }
}

// ── Interaction tag set ──────────────────────────────────────────────────────

/// Known interaction names, without the `qti-` prefix and `-interaction` suffix.
pub const INTERACTION_NAMES: &[&str] = &[
    "associate",
    "choice",
    "custom",
    "drawing",
    "end-attempt",
    "extended-text",
    "gap-match",
    "graphic-associate",
    "graphic-gap-match",
    "graphic-order",
    "hotspot",
    "hottext",
    "inline-choice",
    "match",
    "media",
    "order",
    "portable-custom",
    "position-object",
    "select-point",
    "slider",
    "text-entry",
    "upload",
];

/// Interactions whose semantics require `min-choices` and `max-choices`.
pub const CHOICE_BOUNDED_INTERACTIONS: &[&str] = &[
    "choice",
    "associate",
    "match",
    "gap-match",
    "hottext",
    "graphic-associate",
    "graphic-gap-match",
    "hotspot",
];

/// Full element name for an interaction, e.g. `choice` → `qti-choice-interaction`.
pub fn interaction_element(name: &str) -> String {
    format!("{QTI_PREFIX}{name}-interaction")
}

/// Whether `element` is one of the known interaction elements.
pub fn is_interaction_element(element: &str) -> bool {
    element
        .strip_prefix(QTI_PREFIX)
        .and_then(|rest| rest.strip_suffix("-interaction"))
        .is_some_and(|name| INTERACTION_NAMES.contains(&name))
}
