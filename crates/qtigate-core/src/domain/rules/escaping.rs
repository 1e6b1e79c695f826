//! Literal `<` and `>` in text content and attribute values.

use crate::domain::{
    entities::ValidationContext,
    error::ValidationError,
    markup::{blank_matches, snippet, static_regex},
};

fn unescaped(character: char, location: &'static str, text: &str, at: usize) -> ValidationError {
    let entity = if character == '<' { "&lt;" } else { "&gt;" };
    ValidationError::UnescapedCharacter {
        character,
        entity,
        location,
        context: snippet(text, at, at + 1),
    }
}

/// Reject unescaped angle brackets outside of markup.
///
/// The XML declaration, comments and CDATA sections are blanked first.
/// Attribute values are then checked and masked, so that what is left
/// between `>` and `<` is text content.
pub fn check_escaping(xml: &str, _ctx: &ValidationContext) -> Result<(), ValidationError> {
    let mut work = blank_matches(xml, static_regex!(r"<\?xml[^>]*\?>"));
    work = blank_matches(&work, static_regex!(r"(?s)<!--.*?-->"));
    work = blank_matches(&work, static_regex!(r"(?s)<!\[CDATA\[.*?\]\]>"));

    let attr_values = static_regex!(r#"=\s*(?:"([^"]*)"|'([^']*)')"#);
    for caps in attr_values.captures_iter(&work) {
        let Some(value) = caps.get(1).or_else(|| caps.get(2)) else {
            continue;
        };
        if let Some(offset) = value.as_str().find(['<', '>']) {
            let at = value.start() + offset;
            let character = if value.as_str()[offset..].starts_with('<') { '<' } else { '>' };
            return Err(unescaped(character, "attribute value", xml, at));
        }
    }
    work = attr_values
        .replace_all(&work, |caps: &regex::Captures<'_>| "_".repeat(caps[0].len()))
        .into_owned();

    let text_nodes = static_regex!(r">([^<]*)<");
    let stray_close = text_nodes
        .captures_iter(&work)
        .filter_map(|caps| caps.get(1))
        .find_map(|text| text.as_str().find('>').map(|offset| text.start() + offset));
    if let Some(at) = stray_close {
        return Err(unescaped('>', "text content", xml, at));
    }

    let stray_open = static_regex!(r"<(?:[^A-Za-z_:/!?]|$)");
    if let Some(m) = stray_open.find(&work) {
        return Err(unescaped('<', "text content", xml, m.start()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rules::fixtures::*;

    #[test]
    fn escaped_entities_and_markup_pass() {
        let xml = item(
            r#"<p title="a &lt; b">3 &lt; 4 &amp;&amp; 5 &gt; 2</p><!-- a < b --><![CDATA[ x > y ]]>"#,
        );
        assert!(check_escaping(&xml, &item_ctx()).is_ok());
    }

    #[test]
    fn literal_greater_than_in_text_is_flagged() {
        let err = check_escaping(&item("<p>5 > 2</p>"), &item_ctx()).unwrap_err();
        match err {
            ValidationError::UnescapedCharacter {
                character,
                location,
                ref context,
                ..
            } => {
                assert_eq!(character, '>');
                assert_eq!(location, "text content");
                assert!(context.contains("5 > 2"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn literal_less_than_in_text_is_flagged() {
        let err = check_escaping(&item("<p>3 < 4</p>"), &item_ctx()).unwrap_err();
        assert!(err.to_string().contains("&lt;"));
        assert!(check_escaping(&item("<p>x<5</p>"), &item_ctx()).is_err());
    }

    #[test]
    fn brackets_in_attribute_values_are_flagged() {
        let err = check_escaping(&item(r#"<img alt="x > 1" src="a.png"/>"#), &item_ctx())
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::UnescapedCharacter {
                location: "attribute value",
                character: '>',
                ..
            }
        ));
    }
}
