//! The synchronous content rule set.
//!
//! Every rule is a pure function over the raw document text. A rule either
//! returns `Ok(())` or a single [`ValidationError`] describing the first
//! instance of its defect class. Rules share no state, so the pipeline can
//! run all of them and collect every failure.

pub mod escaping;
pub mod latex;
pub mod placement;
pub mod responses;
pub mod structure;

use crate::domain::{entities::ValidationContext, error::ValidationError, svg};

/// Signature shared by all synchronous content checks.
pub type RuleFn = fn(&str, &ValidationContext) -> Result<(), ValidationError>;

/// A named content check.
#[derive(Clone, Copy)]
pub struct ContentRule {
    pub name: &'static str,
    pub check: RuleFn,
}

impl ContentRule {
    pub const fn new(name: &'static str, check: RuleFn) -> Self {
        Self { name, check }
    }

    pub fn apply(&self, xml: &str, ctx: &ValidationContext) -> Result<(), ValidationError> {
        (self.check)(xml, ctx)
    }
}

impl std::fmt::Debug for ContentRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ContentRule").field(&self.name).finish()
    }
}

/// All content rules, in execution order.
pub const CONTENT_RULES: &[ContentRule] = &[
    ContentRule::new("root-element", structure::check_root_element),
    ContentRule::new("title-attribute", structure::check_title_attribute),
    ContentRule::new("truncated-tags", structure::check_truncated_tags),
    ContentRule::new("perseus-artifacts", structure::check_perseus_artifacts),
    ContentRule::new("prompt-placement", placement::check_prompt_placement),
    ContentRule::new("choice-bounds", placement::check_choice_bounds),
    ContentRule::new("text-entry-placement", placement::check_text_entry_placement),
    ContentRule::new("stimulus-body-elements", placement::check_stimulus_body_elements),
    ContentRule::new("stimulus-body-svg", placement::check_stimulus_body_svg),
    ContentRule::new("escaping", escaping::check_escaping),
    ContentRule::new("embedded-svg", svg::validate_embedded_svgs),
    ContentRule::new("latex", latex::check_no_latex),
    ContentRule::new("mfenced", latex::check_no_mfenced),
    ContentRule::new("decimal-formats", responses::check_decimal_formats),
    ContentRule::new("equation-reversibility", responses::check_equation_reversibility),
];
