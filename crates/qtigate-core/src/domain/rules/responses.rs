//! Answer-key rules for text-entry responses.

use std::collections::HashSet;

use crate::domain::{
    entities::ValidationContext,
    error::ValidationError,
    markup::{attribute, element_inner, static_regex, unescape_entities},
};

/// A `qti-response-declaration` and its correct values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseDeclaration {
    pub identifier: String,
    pub base_type: String,
    pub correct_values: Vec<String>,
}

/// Every response declaration in document order.
pub fn response_declarations(xml: &str) -> Vec<ResponseDeclaration> {
    let decl = static_regex!(
        r"(?s)<qti-response-declaration\b([^>]*?)(?:/>|>(.*?)</qti-response-declaration>)"
    );
    let value = static_regex!(r"(?s)<qti-value\b[^>]*>(.*?)</qti-value>");

    decl.captures_iter(xml)
        .map(|caps| {
            let attrs = caps.get(1).map_or("", |m| m.as_str());
            let inner = caps.get(2).map_or("", |m| m.as_str());
            let correct_values = element_inner(inner, "qti-correct-response")
                .map(|(_, correct)| {
                    value
                        .captures_iter(correct)
                        .map(|v| unescape_entities(v[1].trim()))
                        .collect()
                })
                .unwrap_or_default();
            ResponseDeclaration {
                identifier: attribute(attrs, "identifier").unwrap_or_default().to_string(),
                base_type: attribute(attrs, "base-type").unwrap_or_default().to_string(),
                correct_values,
            }
        })
        .collect()
}

/// Response identifiers bound to a text-entry interaction.
pub fn text_entry_responses(xml: &str) -> HashSet<String> {
    static_regex!(r"<qti-text-entry-interaction\b([^>]*)>")
        .captures_iter(xml)
        .filter_map(|caps| attribute(&caps[1], "response-identifier").map(str::to_string))
        .collect()
}

/// `0.5` → (`0.5`, `.5`); `.5` → (`0.5`, `.5`); anything else → `None`.
pub fn decimal_spellings(value: &str) -> Option<(String, String)> {
    if static_regex!(r"^0\.\d+$").is_match(value) {
        Some((value.to_string(), value[1..].to_string()))
    } else if static_regex!(r"^\.\d+$").is_match(value) {
        Some((format!("0{value}"), value.to_string()))
    } else {
        None
    }
}

/// A lone decimal answer below one must accept both `0.5` and `.5`.
pub fn check_decimal_formats(xml: &str, _ctx: &ValidationContext) -> Result<(), ValidationError> {
    let entries = text_entry_responses(xml);
    for decl in response_declarations(xml) {
        if !matches!(decl.base_type.as_str(), "integer" | "float" | "string")
            || !entries.contains(&decl.identifier)
        {
            continue;
        }
        let [value] = decl.correct_values.as_slice() else {
            continue;
        };
        if let Some((leading_zero, bare)) = decimal_spellings(value) {
            return Err(ValidationError::IncompleteDecimalFormats {
                response: decl.identifier,
                value: value.clone(),
                leading_zero,
                bare,
            });
        }
    }
    Ok(())
}

const INEQUALITIES: &[&str] = &["<", ">", "&lt;", "&gt;", "≤", "≥", "≠", "!="];

fn has_math_token(side: &str) -> bool {
    static_regex!(
        r"[0-9A-Za-z]|[+\-*/^√π]|\b(?:sin|cos|tan|log|ln)\b"
    )
    .is_match(side)
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// `L=R` → `R=L` for a single-equals equation with math on both sides.
pub fn mirrored_equation(value: &str) -> Option<String> {
    if INEQUALITIES.iter().any(|op| value.contains(op)) {
        return None;
    }
    let (lhs, rhs) = value.split_once('=')?;
    if rhs.contains('=') {
        return None;
    }
    let (lhs, rhs) = (lhs.trim(), rhs.trim());
    (has_math_token(lhs) && has_math_token(rhs)).then(|| format!("{rhs}={lhs}"))
}

/// An accepted equation must also be accepted with its sides swapped.
pub fn check_equation_reversibility(
    xml: &str,
    _ctx: &ValidationContext,
) -> Result<(), ValidationError> {
    let entries = text_entry_responses(xml);
    for decl in response_declarations(xml) {
        if decl.base_type != "string" || !entries.contains(&decl.identifier) {
            continue;
        }
        let accepted: HashSet<String> = decl
            .correct_values
            .iter()
            .map(|v| strip_whitespace(v))
            .collect();
        for value in &decl.correct_values {
            let Some(mirrored) = mirrored_equation(value) else {
                continue;
            };
            if !accepted.contains(&strip_whitespace(&mirrored)) {
                return Err(ValidationError::IrreversibleEquation {
                    response: decl.identifier,
                    equation: value.clone(),
                    mirrored,
                });
            }
        }
    }
    Ok(())
}
