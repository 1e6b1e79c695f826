//! Text-level helpers shared by the content rules.
//!
//! Documents are never parsed into a tree. Everything here works on byte
//! offsets into the raw text so diagnostics can quote the original source.

use regex::Regex;

/// Compile a constant pattern once and hand out a `&'static Regex`.
macro_rules! static_regex {
    ($pattern:expr) => {{
        static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
        RE.get_or_init(|| regex::Regex::new($pattern).expect("static regex pattern is valid"))
    }};
}

pub(crate) use static_regex;

/// Characters of context kept on each side of an offending construct.
pub const CONTEXT_RADIUS: usize = 60;

/// Substring surrounding `start..end`, clamped to char boundaries, with
/// whitespace runs collapsed so the snippet stays on one line.
pub fn snippet(text: &str, start: usize, end: usize) -> String {
    snippet_with_radius(text, start, end, CONTEXT_RADIUS)
}

pub fn snippet_with_radius(text: &str, start: usize, end: usize, radius: usize) -> String {
    let from = floor_char_boundary(text, start.saturating_sub(radius));
    let to = ceil_char_boundary(text, end.saturating_add(radius).min(text.len()));
    let mut out = String::with_capacity(to - from + 6);
    if from > 0 {
        out.push_str("...");
    }
    let mut last_space = false;
    for c in text[from..to].chars() {
        if c.is_whitespace() {
            if !last_space {
                out.push(' ');
            }
            last_space = true;
        } else {
            out.push(c);
            last_space = false;
        }
    }
    if to < text.len() {
        out.push_str("...");
    }
    out
}

fn floor_char_boundary(text: &str, mut idx: usize) -> usize {
    idx = idx.min(text.len());
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_char_boundary(text: &str, mut idx: usize) -> usize {
    while idx < text.len() && !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

/// Replace every match of `re` with spaces of the same byte length, so that
/// offsets in the result still point at the same bytes of `text`.
pub fn blank_matches(text: &str, re: &Regex) -> String {
    re.replace_all(text, |caps: &regex::Captures<'_>| " ".repeat(caps[0].len()))
        .into_owned()
}

/// Value of `name="..."` (or single-quoted) inside an attribute list.
pub fn attribute<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    let re = static_regex!(r#"([A-Za-z_:][\w:.-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#);
    re.captures_iter(attrs)
        .find(|caps| &caps[1] == name)
        .and_then(|caps| caps.get(2).or_else(|| caps.get(3)))
        .map(|m| m.as_str())
}

/// Attribute list of the first `<element ...>` opening tag.
pub fn opening_tag_attributes<'a>(xml: &'a str, element: &str) -> Option<&'a str> {
    let needle = format!("<{element}");
    let mut offset = 0;
    while let Some(found) = xml[offset..].find(&needle) {
        let start = offset + found + needle.len();
        let rest = &xml[start..];
        let boundary = rest.chars().next();
        if boundary.is_some_and(|c| c.is_whitespace() || c == '>' || c == '/') {
            let end = rest.find('>')?;
            return Some(rest[..end].trim_end_matches('/'));
        }
        offset = start;
    }
    None
}

/// Attribute of the document's root element.
pub fn root_attribute<'a>(xml: &'a str, root: &str, name: &str) -> Option<&'a str> {
    opening_tag_attributes(xml, root).and_then(|attrs| attribute(attrs, name))
}

/// Inner content of the first `<element ...>...</element>` pair.
pub fn element_inner<'a>(xml: &'a str, element: &str) -> Option<(usize, &'a str)> {
    let open = format!("<{element}");
    let close = format!("</{element}>");
    let mut offset = 0;
    while let Some(found) = xml[offset..].find(&open) {
        let tag_start = offset + found;
        let after_name = tag_start + open.len();
        let boundary = xml[after_name..].chars().next();
        if boundary.is_some_and(|c| c.is_whitespace() || c == '>') {
            let tag_end = after_name + xml[after_name..].find('>')? + 1;
            let inner_end = tag_end + xml[tag_end..].find(&close)?;
            return Some((tag_end, &xml[tag_end..inner_end]));
        }
        offset = after_name;
    }
    None
}

/// Minimal entity decoding for values compared as plain text.
pub fn unescape_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
