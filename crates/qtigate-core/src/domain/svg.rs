//! Tag-balance checking for SVG embedded as `data:image/svg+xml` URIs.
//!
//! # Approach
//!
//! The decoded SVG is never handed to an XML parser. Instead a working copy
//! is prepared in which every construct that cannot carry structure
//! (CDATA, comments, processing instructions, DOCTYPE, attribute values,
//! text content) is overwritten with same-length filler. Offsets in the
//! working copy therefore still point into the original decoded text, which
//! is what every diagnostic quotes.
//!
//! The remaining `<...>` constructs are walked with an explicit stack of
//! open element names. The first defect ends the walk.

use std::fmt;

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use percent_encoding::percent_decode_str;
use thiserror::Error;

use crate::domain::{
    entities::ValidationContext,
    error::ValidationError,
    markup::{blank_matches, snippet, static_regex},
};

const SVG_MEDIA_TYPE: &str = "data:image/svg+xml";

/// Elements that never take a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Base64 as browsers accept it: padding optional.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// A structural defect in one embedded SVG.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SvgDefect {
    #[error("malformed data URI: {reason}")]
    MalformedDataUri { reason: String },

    #[error("invalid closing tag '{fragment}': space before tag name")]
    SpaceInClosingTag {
        fragment: String,
        tag: String,
        context: String,
    },

    #[error("extra closing tag </{tag}> with no matching opening tag")]
    ExtraClosingTag { tag: String, context: String },

    #[error(
        "mismatched closing tag: found </{found}> but expected </{expected}> (opened at: {opened_at})"
    )]
    MismatchedClosingTag {
        found: String,
        expected: String,
        opened_at: String,
        context: String,
    },

    #[error("unclosed tag(s): {}", .tags.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
    UnclosedTags { tags: Vec<UnclosedTag> },

    #[error("no <svg> root element found")]
    MissingSvgRoot,

    #[error(
        "multiple unterminated <svg> roots: {opened} opening tags but only {closed} closing tags"
    )]
    UnterminatedSvgRoots { opened: usize, closed: usize },
}

/// An element still open when the document ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnclosedTag {
    pub name: String,
    pub context: String,
}

impl fmt::Display for UnclosedTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}> (opened at: {})", self.name, self.context)
    }
}

impl SvgDefect {
    pub fn context(&self) -> Option<&str> {
        match self {
            Self::SpaceInClosingTag { context, .. }
            | Self::ExtraClosingTag { context, .. }
            | Self::MismatchedClosingTag { context, .. } => Some(context),
            Self::UnclosedTags { tags } => tags.first().map(|t| t.context.as_str()),
            _ => None,
        }
    }

    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::MalformedDataUri { .. } => Some(
                "Re-encode the SVG with base64 (data:image/svg+xml;base64,...) or encodeURIComponent".into(),
            ),
            Self::SpaceInClosingTag { tag, .. } => Some(format!("Write </{tag}>")),
            Self::ExtraClosingTag { tag, .. } => Some(format!("Remove the stray </{tag}>")),
            Self::MismatchedClosingTag {
                found, expected, ..
            } => Some(format!("Close </{expected}> before </{found}>")),
            Self::UnclosedTags { tags } => Some(format!(
                "Add {}",
                tags.iter()
                    .rev()
                    .map(|t| format!("</{}>", t.name))
                    .collect::<String>()
            )),
            Self::MissingSvgRoot => Some("Wrap the drawing in <svg xmlns=\"http://www.w3.org/2000/svg\">...</svg>".into()),
            Self::UnterminatedSvgRoots { .. } => Some("Close every <svg> with </svg>".into()),
        }
    }
}

/// Every `img` whose `src` is an SVG data URI, with its byte offset.
pub fn embedded_svg_uris(xml: &str) -> Vec<(usize, &str)> {
    let re = static_regex!(
        r#"(?i)<img\b[^>]*?\bsrc\s*=\s*(?:"(data:image/svg\+xml[^"]*)"|'(data:image/svg\+xml[^']*)')"#
    );
    re.captures_iter(xml)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| (m.start(), m.as_str()))
        .collect()
}

/// Decode a `data:image/svg+xml[;...][;base64],payload` URI to SVG text.
pub fn decode_data_uri(uri: &str) -> Result<String, SvgDefect> {
    let rest = uri
        .get(SVG_MEDIA_TYPE.len()..)
        .filter(|_| uri[..SVG_MEDIA_TYPE.len()].eq_ignore_ascii_case(SVG_MEDIA_TYPE))
        .ok_or_else(|| malformed("not an SVG data URI"))?;
    let (params, payload) = rest
        .split_once(',')
        .ok_or_else(|| malformed("missing ',' between media type and data"))?;

    if params.to_ascii_lowercase().contains(";base64") {
        let mut encoded: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        if encoded.contains('%') {
            encoded = percent_decode(&encoded)?;
        }
        let bytes = LENIENT_BASE64
            .decode(encoded.as_bytes())
            .map_err(|e| malformed(format!("invalid base64 payload ({e})")))?;
        String::from_utf8(bytes).map_err(|_| malformed("base64 payload is not UTF-8 text"))
    } else {
        percent_decode(payload)
    }
}

/// Strict percent-decoding: a `%` must start a two-digit hex escape.
fn percent_decode(payload: &str) -> Result<String, SvgDefect> {
    let bytes = payload.as_bytes();
    for (i, _) in payload.match_indices('%') {
        let valid = bytes
            .get(i + 1..i + 3)
            .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
        if !valid {
            return Err(malformed(format!(
                "invalid percent-encoding near '{}'",
                payload[i..].chars().take(3).collect::<String>()
            )));
        }
    }
    percent_decode_str(payload)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| malformed("percent-decoded payload is not UTF-8 text"))
}

fn malformed(reason: impl Into<String>) -> SvgDefect {
    SvgDefect::MalformedDataUri {
        reason: reason.into(),
    }
}

/// Working copy with only tag structure left; byte offsets are preserved.
fn structural_copy(svg: &str) -> String {
    let mut work = blank_matches(svg, static_regex!(r"(?s)<!\[CDATA\[.*?\]\]>"));
    work = blank_matches(&work, static_regex!(r"(?s)<!--.*?-->"));
    work = blank_matches(&work, static_regex!(r"(?s)<\?.*?\?>"));
    work = blank_matches(&work, static_regex!(r"(?is)<!DOCTYPE[^>\[]*(?:\[.*?\])?\s*>"));

    // Attribute values first, so a '>' inside a value cannot end a tag.
    let attr_values = static_regex!(r#"=(\s*)("[^"]*"|'[^']*')"#);
    work = attr_values
        .replace_all(&work, |caps: &regex::Captures<'_>| {
            let quoted = &caps[2];
            let quote = &quoted[..1];
            format!(
                "={}{quote}{}{quote}",
                &caps[1],
                "_".repeat(quoted.len() - 2)
            )
        })
        .into_owned();

    let text_nodes = static_regex!(r">([^<]+)<");
    text_nodes
        .replace_all(&work, |caps: &regex::Captures<'_>| {
            format!(">{}<", " ".repeat(caps[1].len()))
        })
        .into_owned()
}

struct OpenTag<'a> {
    name: &'a str,
    start: usize,
    end: usize,
}

impl OpenTag<'_> {
    fn unclosed(&self, original: &str) -> UnclosedTag {
        UnclosedTag {
            name: self.name.to_string(),
            context: snippet(original, self.start, self.end),
        }
    }
}

/// Check that every element in `svg` is properly opened and closed.
pub fn check_structure(svg: &str) -> Result<(), SvgDefect> {
    let work = structural_copy(svg);

    let spaced = static_regex!(r"</\s+([A-Za-z_][\w:.-]*)\s*>");
    if let Some(caps) = spaced.captures(&work) {
        let m = caps.get(0).map_or(0..0, |m| m.range());
        return Err(SvgDefect::SpaceInClosingTag {
            fragment: svg[m.clone()].to_string(),
            tag: caps[1].to_string(),
            context: snippet(svg, m.start, m.end),
        });
    }

    let tokens = static_regex!(r"<(/)?([A-Za-z_][\w:.-]*)[^<>]*?(/)?>");
    let mut stack: Vec<OpenTag<'_>> = Vec::new();

    for caps in tokens.captures_iter(&work) {
        let Some(whole) = caps.get(0) else { continue };
        let Some(name) = caps.get(2).map(|m| &svg[m.range()]) else {
            continue;
        };

        if caps.get(1).is_some() {
            let Some(top) = stack.last() else {
                return Err(SvgDefect::ExtraClosingTag {
                    tag: name.to_string(),
                    context: snippet(svg, whole.start(), whole.end()),
                });
            };
            if top.name == name {
                stack.pop();
                continue;
            }
            if let Some(idx) = stack.iter().rposition(|open| open.name == name) {
                return Err(SvgDefect::UnclosedTags {
                    tags: stack[idx + 1..].iter().map(|o| o.unclosed(svg)).collect(),
                });
            }
            return Err(SvgDefect::MismatchedClosingTag {
                found: name.to_string(),
                expected: top.name.to_string(),
                opened_at: snippet(svg, top.start, top.end),
                context: snippet(svg, whole.start(), whole.end()),
            });
        }

        let self_closing = caps.get(3).is_some();
        if self_closing || VOID_ELEMENTS.contains(&name.to_ascii_lowercase().as_str()) {
            continue;
        }
        stack.push(OpenTag {
            name,
            start: whole.start(),
            end: whole.end(),
        });
    }

    if !stack.is_empty() {
        return Err(SvgDefect::UnclosedTags {
            tags: stack.iter().map(|o| o.unclosed(svg)).collect(),
        });
    }

    let opened = static_regex!(r"<svg\b").find_iter(&work).count();
    if opened == 0 {
        return Err(SvgDefect::MissingSvgRoot);
    }
    let closed = static_regex!(r"</svg\s*>").find_iter(&work).count();
    if opened > closed {
        return Err(SvgDefect::UnterminatedSvgRoots { opened, closed });
    }

    Ok(())
}

/// Decode and check one data URI.
pub fn validate_data_uri(uri: &str) -> Result<(), SvgDefect> {
    let svg = decode_data_uri(uri)?;
    check_structure(&svg)
}

/// Content rule: every embedded SVG image must be structurally sound.
pub fn validate_embedded_svgs(xml: &str, _ctx: &ValidationContext) -> Result<(), ValidationError> {
    for (index, (_, uri)) in embedded_svg_uris(xml).into_iter().enumerate() {
        validate_data_uri(uri).map_err(|defect| ValidationError::InvalidSvg {
            image: index + 1,
            defect,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base64_uri(svg: &str) -> String {
        format!(
            "data:image/svg+xml;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(svg)
        )
    }

    #[test]
    fn well_formed_svg_passes() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg"><g><rect width="1"/><text x="1">a &lt; b</text></g></svg>"#;
        assert_eq!(check_structure(svg), Ok(()));
    }

    #[test]
    fn space_before_tag_name_is_reported_specifically() {
        let svg = "<svg><g><text>hi</text></ g></svg>";
        match check_structure(svg) {
            Err(SvgDefect::SpaceInClosingTag { fragment, tag, .. }) => {
                assert_eq!(fragment, "</ g>");
                assert_eq!(tag, "g");
            }
            other => panic!("expected space defect, got {other:?}"),
        }
    }

    #[test]
    fn closing_after_self_closing_is_extra() {
        let err = check_structure("<rect/></rect>").unwrap_err();
        assert!(matches!(err, SvgDefect::ExtraClosingTag { ref tag, .. } if tag == "rect"));
        assert!(err.to_string().contains("extra closing tag"));
    }

    #[test]
    fn unclosed_group_is_named() {
        let err = check_structure("<svg><g></svg>").unwrap_err();
        match &err {
            SvgDefect::UnclosedTags { tags } => {
                assert_eq!(tags.len(), 1);
                assert_eq!(tags[0].name, "g");
            }
            other => panic!("expected unclosed tags, got {other:?}"),
        }
        assert!(err.to_string().starts_with("unclosed tag(s): <g>"));
    }

    #[test]
    fn unclosed_at_end_lists_every_entry() {
        let err = check_structure("<svg><g><a>").unwrap_err();
        match err {
            SvgDefect::UnclosedTags { tags } => {
                let names: Vec<_> = tags.iter().map(|t| t.name.as_str()).collect();
                assert_eq!(names, ["svg", "g", "a"]);
            }
            other => panic!("expected unclosed tags, got {other:?}"),
        }
    }

    #[test]
    fn mismatched_closing_names_both_tags() {
        let err = check_structure("<svg><g></text></g></svg>").unwrap_err();
        match err {
            SvgDefect::MismatchedClosingTag {
                found,
                expected,
                opened_at,
                ..
            } => {
                assert_eq!(found, "text");
                assert_eq!(expected, "g");
                assert!(opened_at.contains("<g>"));
            }
            other => panic!("expected mismatch, got {other:?}"),
        }
    }

    #[test]
    fn markup_inside_attributes_and_text_is_ignored() {
        let svg = r#"<svg><desc title="</g>">x > y</desc><!-- </svg> --><![CDATA[</g>]]></svg>"#;
        assert_eq!(check_structure(svg), Ok(()));
    }

    #[test]
    fn closing_tag_in_top_level_attribute_is_not_extra() {
        let lone = r#"<rect data-note='</rect>'/>"#;
        assert_eq!(check_structure(lone), Err(SvgDefect::MissingSvgRoot));
    }

    #[test]
    fn void_elements_need_no_closing_tag() {
        assert_eq!(check_structure("<svg><foreignObject><br></foreignObject></svg>"), Ok(()));
    }

    #[test]
    fn missing_root_is_reported() {
        assert_eq!(check_structure("<g></g>"), Err(SvgDefect::MissingSvgRoot));
    }

    #[test]
    fn self_closing_root_counts_as_unterminated() {
        assert_eq!(
            check_structure("<svg/>"),
            Err(SvgDefect::UnterminatedSvgRoots {
                opened: 1,
                closed: 0
            })
        );
    }

    #[test]
    fn decodes_base64_and_percent_encoded_uris() {
        let svg = "<svg><g></g></svg>";
        assert_eq!(decode_data_uri(&base64_uri(svg)).unwrap(), svg);
        assert_eq!(
            decode_data_uri("data:image/svg+xml;utf8,%3Csvg%3E%3C%2Fsvg%3E").unwrap(),
            "<svg></svg>"
        );
    }

    #[test]
    fn malformed_uris_are_reported() {
        assert!(matches!(
            decode_data_uri("data:image/svg+xml;base64,@@@"),
            Err(SvgDefect::MalformedDataUri { .. })
        ));
        assert!(matches!(
            decode_data_uri("data:image/svg+xml,%E0%A4%A"),
            Err(SvgDefect::MalformedDataUri { .. })
        ));
        assert!(matches!(
            decode_data_uri("data:image/svg+xml;base64"),
            Err(SvgDefect::MalformedDataUri { .. })
        ));
    }

    #[test]
    fn finds_single_and_double_quoted_sources() {
        let xml = format!(
            r#"<p><img alt="a" src="{}"/><img src='data:image/svg+xml,%3Csvg%3E%3C/svg%3E'/><img src="https://x/y.png"/></p>"#,
            base64_uri("<svg></svg>")
        );
        assert_eq!(embedded_svg_uris(&xml).len(), 2);
    }

    #[test]
    fn rule_reports_image_index() {
        let xml = format!(
            r#"<img src="{}"/><img src="{}"/>"#,
            base64_uri("<svg></svg>"),
            base64_uri("<svg><g><text>hi</text></ g></svg>")
        );
        let ctx = ValidationContext::new("q", crate::domain::RootTag::Item, "t");
        let err = validate_embedded_svgs(&xml, &ctx).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidSvg { image: 2, .. }));
        assert!(err.to_string().contains("space before tag name"));
    }
}
