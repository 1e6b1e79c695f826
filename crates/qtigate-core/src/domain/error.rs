// ============================================================================
// domain/error.rs - VALIDATION FAILURE TAXONOMY
// ============================================================================

use thiserror::Error;

use crate::domain::svg::SvgDefect;

/// One independently diagnosable defect found in a QTI document.
///
/// All errors are:
/// - Cloneable (results are echoed to callers and re-rendered)
/// - Categorizable (structural, placement, math, ...)
/// - Actionable (context snippet and, where possible, a suggested fix)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    // ========================================================================
    // Structural XML
    // ========================================================================
    #[error(
        "Invalid XML: incomplete or missing root element. Expected an XML declaration followed by a single <{root}>...</{root}>"
    )]
    MissingRootElement { root: &'static str },

    #[error("Missing title attribute: <{root}> must carry a non-empty title=\"...\"")]
    MissingTitle { root: &'static str },

    #[error("Empty title attribute: <{root}> has title=\"\"; provide a descriptive title")]
    EmptyTitle { root: &'static str },

    #[error("Truncated closing tag '{fragment}' detected; the content appears to be cut off")]
    TruncatedTag { fragment: String, context: String },

    #[error("Perseus artifact '{artifact}' found; legacy widget placeholders must be converted to QTI")]
    PerseusArtifact { artifact: String, context: String },

    #[error("Unescaped '{character}' in {location}; escape it as {entity}")]
    UnescapedCharacter {
        character: char,
        entity: &'static str,
        location: &'static str,
        context: String,
    },

    // ========================================================================
    // Placement
    // ========================================================================
    #[error(
        "Invalid <qti-prompt> placement: a prompt must be the direct child of an interaction element"
    )]
    PromptOutsideInteraction { context: String },

    #[error(
        "Invalid <qti-prompt> placement: the document has no interaction elements, so a prompt is not allowed"
    )]
    PromptWithoutInteraction { context: String },

    #[error(
        "<qti-text-entry-interaction> is a direct child of <qti-item-body>; inline interactions must be wrapped in a block element such as <p>"
    )]
    UnwrappedTextEntry { context: String },

    #[error("Interaction element <{tag}> is not allowed in a stimulus body; stimuli are HTML-only")]
    InteractionInStimulus { tag: String, context: String },

    #[error("<{tag}> is not allowed in a stimulus body; prompts belong to items")]
    PromptInStimulus { tag: String, context: String },

    #[error("QTI element <{tag}> is not allowed in a stimulus body; use plain HTML elements")]
    QtiElementInStimulus { tag: String, context: String },

    #[error("Inline <svg> is not allowed in a stimulus body")]
    SvgInStimulus { context: String },

    // ========================================================================
    // Attribute completeness
    // ========================================================================
    #[error("<{tag}> is missing required attribute{} {}", plural(.missing), .missing.join(" and "))]
    MissingChoiceBounds {
        tag: String,
        missing: Vec<&'static str>,
        context: String,
    },

    // ========================================================================
    // Content policy
    // ========================================================================
    #[error("LaTeX command '{command}' detected; math must be authored as MathML")]
    LatexCommand { command: String, context: String },

    #[error("LaTeX-style math delimited by dollar signs detected: '{span}'; use MathML")]
    LatexMath { span: String, context: String },

    #[error(
        "Deprecated <mfenced> element found (open=\"{open}\" close=\"{close}\"{}); replace it with {replacement}",
        .separators.as_ref().map(|s| format!(" separators=\"{s}\"")).unwrap_or_default()
    )]
    DeprecatedMfenced {
        open: String,
        close: String,
        separators: Option<String>,
        replacement: String,
        context: String,
    },

    // ========================================================================
    // Semantic math
    // ========================================================================
    #[error(
        "Response '{response}' accepts only \"{value}\"; decimal answers must list both \"{leading_zero}\" and \"{bare}\" as separate <qti-value> entries"
    )]
    IncompleteDecimalFormats {
        response: String,
        value: String,
        leading_zero: String,
        bare: String,
    },

    #[error(
        "Response '{response}' accepts the equation \"{equation}\" but not its mirrored form \"{mirrored}\"; add both \"{equation}\" and \"{mirrored}\" as accepted values"
    )]
    IrreversibleEquation {
        response: String,
        equation: String,
        mirrored: String,
    },

    // ========================================================================
    // SVG structure
    // ========================================================================
    #[error("Invalid SVG in image #{image}: {defect}")]
    InvalidSvg { image: usize, defect: SvgDefect },

    // ========================================================================
    // External reachability
    // ========================================================================
    #[error("{}", render_broken(.images))]
    BrokenImages { images: Vec<BrokenImage> },

    // ========================================================================
    // Ground truth
    // ========================================================================
    #[error("Missing identifier attribute on <{root}>; ground-truth validation needs it")]
    MissingIdentifier { root: &'static str },

    #[error("Missing <qti-stimulus-body>; nothing to submit for ground-truth validation")]
    MissingStimulusBody,

    #[error("Content service rejected {kind} '{identifier}': {reason}")]
    GroundTruthRejected {
        kind: &'static str,
        identifier: String,
        reason: String,
    },

    // ========================================================================
    // Internal
    // ========================================================================
    #[error("Invalid validation context: {reason}")]
    InvalidContext { reason: String },

    #[error("Validation pass '{rule}' failed unexpectedly: {reason}")]
    RuleFailure { rule: &'static str, reason: String },
}

/// A referenced image that could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenImage {
    pub url: String,
    /// Effective HTTP status.
    pub status: u16,
    /// An alternate-extension URL confirmed to return a real asset.
    pub suggestion: Option<String>,
}

fn plural(items: &[&'static str]) -> &'static str {
    if items.len() == 1 { "" } else { "s" }
}

fn render_broken(images: &[BrokenImage]) -> String {
    let header = format!(
        "{} broken image URL{}:",
        images.len(),
        if images.len() == 1 { "" } else { "s" }
    );
    let lines = images
        .iter()
        .map(|img| {
            match &img.suggestion {
                Some(alt) => format!(
                    "  - {} (HTTP {}); confirmed working: {alt}",
                    img.url, img.status
                ),
                None => format!("  - {} (HTTP {})", img.url, img.status),
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("{header}\n{lines}")
}

impl ValidationError {
    /// Text surrounding the offending construct, when one was captured.
    pub fn context(&self) -> Option<&str> {
        match self {
            Self::TruncatedTag { context, .. }
            | Self::PerseusArtifact { context, .. }
            | Self::UnescapedCharacter { context, .. }
            | Self::PromptOutsideInteraction { context }
            | Self::PromptWithoutInteraction { context }
            | Self::UnwrappedTextEntry { context }
            | Self::InteractionInStimulus { context, .. }
            | Self::PromptInStimulus { context, .. }
            | Self::QtiElementInStimulus { context, .. }
            | Self::SvgInStimulus { context }
            | Self::MissingChoiceBounds { context, .. }
            | Self::LatexCommand { context, .. }
            | Self::LatexMath { context, .. }
            | Self::DeprecatedMfenced { context, .. } => Some(context),
            Self::InvalidSvg { defect, .. } => defect.context(),
            _ => None,
        }
    }

    /// A concrete fix, where the defect admits one.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::MissingTitle { root } | Self::EmptyTitle { root } => {
                Some(format!("Add title=\"...\" to the opening <{root}> tag"))
            }
            Self::UnescapedCharacter {
                character, entity, ..
            } => Some(format!("Replace the literal '{character}' with {entity}")),
            Self::PromptOutsideInteraction { .. } => Some(
                "Move the <qti-prompt> inside its interaction, e.g. <qti-choice-interaction><qti-prompt>...</qti-prompt>...".into(),
            ),
            Self::PromptWithoutInteraction { .. } => {
                Some("Convert the <qti-prompt> into a <p> paragraph".into())
            }
            Self::UnwrappedTextEntry { .. } => Some(
                "Wrap the interaction: <p>Answer: <qti-text-entry-interaction .../></p>".into(),
            ),
            Self::InteractionInStimulus { .. } => Some(
                "Move the interaction into the item that references this stimulus".into(),
            ),
            Self::PromptInStimulus { .. } => {
                Some("Replace the prompt with a <p> paragraph or move it to the item".into())
            }
            Self::QtiElementInStimulus { .. } => {
                Some("Use the equivalent HTML element (p, div, img, table, ...)".into())
            }
            Self::SvgInStimulus { .. } => Some(
                "Render the SVG to a raster image (PNG) and reference it with <img src=\"...\"/>".into(),
            ),
            Self::MissingChoiceBounds { tag, missing, .. } => Some(format!(
                "Add {} to <{tag}>",
                missing
                    .iter()
                    .map(|m| format!("{m}=\"1\""))
                    .collect::<Vec<_>>()
                    .join(" ")
            )),
            Self::LatexCommand { .. } | Self::LatexMath { .. } => {
                Some("Rewrite the expression as <math xmlns=\"http://www.w3.org/1998/Math/MathML\">...</math>".into())
            }
            Self::DeprecatedMfenced { replacement, .. } => Some(replacement.clone()),
            Self::IncompleteDecimalFormats {
                leading_zero, bare, ..
            } => Some(format!(
                "<qti-value>{leading_zero}</qti-value><qti-value>{bare}</qti-value>"
            )),
            Self::IrreversibleEquation { mirrored, .. } => {
                Some(format!("<qti-value>{mirrored}</qti-value>"))
            }
            Self::InvalidSvg { defect, .. } => defect.suggestion(),
            Self::BrokenImages { images } => {
                let fixes: Vec<String> = images
                    .iter()
                    .filter_map(|img| {
                        img.suggestion
                            .as_ref()
                            .map(|alt| format!("{} -> {alt}", img.url))
                    })
                    .collect();
                (!fixes.is_empty()).then(|| format!("Replace: {}", fixes.join(", ")))
            }
            _ => None,
        }
    }

    /// Error category for display styling and reporting.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingRootElement { .. }
            | Self::MissingTitle { .. }
            | Self::EmptyTitle { .. }
            | Self::TruncatedTag { .. }
            | Self::UnescapedCharacter { .. }
            | Self::InvalidSvg { .. } => ErrorCategory::Structure,
            Self::PromptOutsideInteraction { .. }
            | Self::PromptWithoutInteraction { .. }
            | Self::UnwrappedTextEntry { .. }
            | Self::InteractionInStimulus { .. }
            | Self::PromptInStimulus { .. }
            | Self::QtiElementInStimulus { .. }
            | Self::SvgInStimulus { .. } => ErrorCategory::Placement,
            Self::MissingChoiceBounds { .. } => ErrorCategory::Attributes,
            Self::PerseusArtifact { .. }
            | Self::LatexCommand { .. }
            | Self::LatexMath { .. }
            | Self::DeprecatedMfenced { .. } => ErrorCategory::ContentPolicy,
            Self::IncompleteDecimalFormats { .. } | Self::IrreversibleEquation { .. } => {
                ErrorCategory::Math
            }
            Self::BrokenImages { .. } => ErrorCategory::Reachability,
            Self::MissingIdentifier { .. }
            | Self::MissingStimulusBody
            | Self::GroundTruthRejected { .. } => ErrorCategory::GroundTruth,
            Self::InvalidContext { .. } | Self::RuleFailure { .. } => ErrorCategory::Internal,
        }
    }
}

/// Failure taxonomy used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCategory {
    Structure,
    Placement,
    Attributes,
    ContentPolicy,
    Math,
    Reachability,
    GroundTruth,
    Internal,
}

impl ErrorCategory {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Structure => "structure",
            Self::Placement => "placement",
            Self::Attributes => "attributes",
            Self::ContentPolicy => "content-policy",
            Self::Math => "math",
            Self::Reachability => "reachability",
            Self::GroundTruth => "ground-truth",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
