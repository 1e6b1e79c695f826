//! Where interactions, prompts and stimulus content may appear.

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::{
    entities::ValidationContext,
    error::ValidationError,
    markup::{attribute, blank_matches, element_inner, snippet, static_regex},
    value_objects::{
        CHOICE_BOUNDED_INTERACTIONS, INTERACTION_NAMES, RootTag, interaction_element,
        is_interaction_element,
    },
};

/// Block-level elements that may legitimately wrap an inline interaction.
pub const BLOCK_WRAPPERS: &[&str] = &[
    "p",
    "div",
    "li",
    "td",
    "th",
    "dd",
    "dt",
    "blockquote",
    "section",
    "article",
    "aside",
    "nav",
    "header",
    "footer",
    "main",
    "figure",
    "figcaption",
];

/// One `<qti-X-interaction ...>...</qti-X-interaction>` pattern per known interaction.
fn interaction_blocks() -> &'static [Regex] {
    static BLOCKS: OnceLock<Vec<Regex>> = OnceLock::new();
    BLOCKS.get_or_init(|| {
        INTERACTION_NAMES
            .iter()
            .map(|name| {
                let el = regex::escape(&interaction_element(name));
                Regex::new(&format!(r"(?s)<{el}\b[^>]*>.*?</{el}>"))
                    .expect("interaction pattern is valid")
            })
            .collect()
    })
}

fn block_wrappers() -> &'static [Regex] {
    static WRAPPERS: OnceLock<Vec<Regex>> = OnceLock::new();
    WRAPPERS.get_or_init(|| {
        BLOCK_WRAPPERS
            .iter()
            .map(|w| Regex::new(&format!(r"(?s)<{w}\b[^>]*>.*?</{w}>")).expect("wrapper pattern is valid"))
            .collect()
    })
}

fn choice_bounded_tags() -> &'static Regex {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    TAGS.get_or_init(|| {
        let names = CHOICE_BOUNDED_INTERACTIONS
            .iter()
            .map(|n| regex::escape(n))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!(r"<(qti-(?:{names})-interaction)\b([^>]*)>"))
            .expect("choice-bounded pattern is valid")
    })
}

fn contains_interaction(xml: &str) -> bool {
    static_regex!(r"<(qti-[A-Za-z0-9-]+-interaction)\b")
        .captures_iter(xml)
        .any(|caps| is_interaction_element(&caps[1]))
}

/// Prompts must be direct children of an interaction.
///
/// Every complete interaction block is blanked out; a prompt left in the
/// residue was placed somewhere else.
pub fn check_prompt_placement(xml: &str, _ctx: &ValidationContext) -> Result<(), ValidationError> {
    let residue = interaction_blocks()
        .iter()
        .fold(xml.to_string(), |acc, re| blank_matches(&acc, re));

    let Some(m) = static_regex!(r"<(?:qti-)?prompt\b").find(&residue) else {
        return Ok(());
    };
    let context = snippet(xml, m.start(), m.end());
    if contains_interaction(xml) {
        Err(ValidationError::PromptOutsideInteraction { context })
    } else {
        Err(ValidationError::PromptWithoutInteraction { context })
    }
}

/// Choice-style interactions need integer `min-choices` and `max-choices`.
pub fn check_choice_bounds(xml: &str, _ctx: &ValidationContext) -> Result<(), ValidationError> {
    for caps in choice_bounded_tags().captures_iter(xml) {
        let attrs = caps.get(2).map_or("", |m| m.as_str());
        let missing: Vec<&'static str> = ["min-choices", "max-choices"]
            .into_iter()
            .filter(|name| {
                attribute(attrs, name)
                    .and_then(|v| v.trim().parse::<i64>().ok())
                    .is_none()
            })
            .collect();
        if !missing.is_empty() {
            let (start, end) = caps.get(0).map_or((0, 0), |m| (m.start(), m.end()));
            return Err(ValidationError::MissingChoiceBounds {
                tag: caps[1].to_string(),
                missing,
                context: snippet(xml, start, end),
            });
        }
    }
    Ok(())
}

/// Text-entry interactions are inline and must sit inside a block element.
pub fn check_text_entry_placement(
    xml: &str,
    _ctx: &ValidationContext,
) -> Result<(), ValidationError> {
    let Some((_, body)) = element_inner(xml, "qti-item-body") else {
        return Ok(());
    };

    let mut residue = body.to_string();
    loop {
        let next = block_wrappers()
            .iter()
            .fold(residue.clone(), |acc, re| blank_matches(&acc, re));
        if next == residue {
            break;
        }
        residue = next;
    }

    match static_regex!(r"<qti-text-entry-interaction\b").find(&residue) {
        Some(m) => Err(ValidationError::UnwrappedTextEntry {
            context: snippet(body, m.start(), m.end()),
        }),
        None => Ok(()),
    }
}

/// Stimulus bodies are HTML only: no `qti-*` elements.
pub fn check_stimulus_body_elements(
    xml: &str,
    ctx: &ValidationContext,
) -> Result<(), ValidationError> {
    if ctx.root_tag() != RootTag::Stimulus {
        return Ok(());
    }
    let Some((_, body)) = element_inner(xml, "qti-stimulus-body") else {
        return Ok(());
    };
    let Some(caps) = static_regex!(r"<(qti-[A-Za-z0-9_.:-]*)").captures(body) else {
        return Ok(());
    };

    let tag = caps[1].to_string();
    let (start, end) = caps.get(0).map_or((0, 0), |m| (m.start(), m.end()));
    let context = snippet(body, start, end);
    Err(if is_interaction_element(&tag) {
        ValidationError::InteractionInStimulus { tag, context }
    } else if tag == "qti-prompt" {
        ValidationError::PromptInStimulus { tag, context }
    } else {
        ValidationError::QtiElementInStimulus { tag, context }
    })
}

/// Stimulus bodies must not embed inline SVG.
pub fn check_stimulus_body_svg(xml: &str, ctx: &ValidationContext) -> Result<(), ValidationError> {
    if ctx.root_tag() != RootTag::Stimulus {
        return Ok(());
    }
    let Some((_, body)) = element_inner(xml, "qti-stimulus-body") else {
        return Ok(());
    };
    match static_regex!(r"<svg\b").find(body) {
        Some(m) => Err(ValidationError::SvgInStimulus {
            context: snippet(body, m.start(), m.end()),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rules::fixtures::*;

    #[test]
    fn prompt_inside_interaction_is_fine() {
        let xml = item(
            r#"<qti-order-interaction response-identifier="R"><qti-prompt>Order these</qti-prompt></qti-order-interaction>"#,
        );
        assert!(check_prompt_placement(&xml, &item_ctx()).is_ok());
    }

    #[test]
    fn prompt_outside_interaction_is_flagged() {
        let xml = item(
            r#"<qti-prompt>Answer below</qti-prompt>
<qti-choice-interaction response-identifier="R" min-choices="1" max-choices="1"></qti-choice-interaction>"#,
        );
        let err = check_prompt_placement(&xml, &item_ctx()).unwrap_err();
        assert!(matches!(err, ValidationError::PromptOutsideInteraction { .. }));
        assert!(err.context().unwrap().contains("<qti-prompt>"));
    }

    #[test]
    fn prompt_without_any_interaction_gets_paragraph_guidance() {
        let xml = item("<qti-prompt>Read the passage</qti-prompt>");
        let err = check_prompt_placement(&xml, &item_ctx()).unwrap_err();
        assert!(matches!(err, ValidationError::PromptWithoutInteraction { .. }));
        assert!(err.suggestion().unwrap().contains("<p>"));
    }

    #[test]
    fn choice_bounds_missing_both_is_one_error() {
        let xml = item(r#"<qti-choice-interaction response-identifier="R"></qti-choice-interaction>"#);
        let err = check_choice_bounds(&xml, &item_ctx()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("min-choices"), "{msg}");
        assert!(msg.contains("max-choices"), "{msg}");
    }

    #[test]
    fn choice_bounds_names_only_the_missing_one() {
        let xml = item(r#"<qti-hotspot-interaction min-choices="0"></qti-hotspot-interaction>"#);
        match check_choice_bounds(&xml, &item_ctx()).unwrap_err() {
            ValidationError::MissingChoiceBounds { tag, missing, .. } => {
                assert_eq!(tag, "qti-hotspot-interaction");
                assert_eq!(missing, vec!["max-choices"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn choice_bounds_require_integers() {
        let xml = item(r#"<qti-match-interaction min-choices="one" max-choices="2"></qti-match-interaction>"#);
        assert!(check_choice_bounds(&xml, &item_ctx()).is_err());
    }

    #[test]
    fn unbounded_interactions_are_not_checked() {
        let xml = item(r#"<p><qti-inline-choice-interaction response-identifier="R"/></p>"#);
        assert!(check_choice_bounds(&xml, &item_ctx()).is_ok());
    }

    #[test]
    fn wrapped_text_entry_passes() {
        let xml = item(
            r#"<div><p>x = <qti-text-entry-interaction response-identifier="R"/></p></div>"#,
        );
        assert!(check_text_entry_placement(&xml, &item_ctx()).is_ok());
    }

    #[test]
    fn bare_text_entry_in_item_body_is_flagged() {
        let xml = item(r#"<p>Solve.</p><qti-text-entry-interaction response-identifier="R"/>"#);
        let err = check_text_entry_placement(&xml, &item_ctx()).unwrap_err();
        assert!(matches!(err, ValidationError::UnwrappedTextEntry { .. }));
    }

    #[test]
    fn stimulus_body_rejects_qti_elements_with_specific_guidance() {
        let cases = [
            (
                r#"<qti-choice-interaction max-choices="1"></qti-choice-interaction>"#,
                "Interaction element",
            ),
            ("<qti-prompt>Read</qti-prompt>", "prompts belong to items"),
            ("<qti-rubric-block>x</qti-rubric-block>", "QTI element"),
        ];
        for (body, expected) in cases {
            let err = check_stimulus_body_elements(&stimulus(body), &stimulus_ctx()).unwrap_err();
            assert!(err.to_string().contains(expected), "{body}: {err}");
        }
    }

    #[test]
    fn stimulus_rules_ignore_items() {
        let xml = item("<qti-rubric-block><svg></svg></qti-rubric-block>");
        assert!(check_stimulus_body_elements(&xml, &item_ctx()).is_ok());
        assert!(check_stimulus_body_svg(&xml, &item_ctx()).is_ok());
    }

    #[test]
    fn inline_svg_in_stimulus_is_flagged() {
        let xml = stimulus(r#"<p>Figure</p><svg viewBox="0 0 1 1"></svg>"#);
        let err = check_stimulus_body_svg(&xml, &stimulus_ctx()).unwrap_err();
        assert!(err.suggestion().unwrap().contains("raster"));
    }
}
