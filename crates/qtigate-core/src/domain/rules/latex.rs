//! Math must be MathML: no LaTeX, no deprecated `<mfenced>`.

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::{
    entities::ValidationContext,
    error::ValidationError,
    markup::{attribute, blank_matches, snippet, static_regex},
};

/// Patterns that make a `$...$` span read as math rather than prose.
const MATH_INDICATORS: &[&str] = &[
    // LaTeX commands
    r"\\[A-Za-z]+",
    // sub- and superscripts
    r"[A-Za-z0-9})]\s*[_^]\s*[{A-Za-z0-9(]",
    // variable next to an operator
    r"(?:^|[^A-Za-z])[A-Za-z]\s*[=+\-*/<>]\s*[A-Za-z0-9(]",
    r"[0-9)]\s*[=+\-*/^]\s*[A-Za-z(]",
    r"\d[A-Za-z]\b",
    // functions
    r"\b(?:sin|cos|tan|sec|csc|cot|log|ln|exp|sqrt)\s*(?:\(|\d|[A-Za-z]\b)",
    // fractions
    r"\d+\s*/\s*\d+",
    // Greek letters, by name or symbol
    r"\b(?:alpha|beta|gamma|delta|epsilon|theta|lambda|mu|pi|rho|sigma|tau|phi|omega)\b",
    r"[\x{0391}-\x{03A9}\x{03B1}-\x{03C9}]",
    // coordinate pairs
    r"\(\s*-?\d+(?:\.\d+)?\s*,\s*-?\d+(?:\.\d+)?\s*\)",
];

fn math_indicators() -> &'static [Regex] {
    static COMPILED: OnceLock<Vec<Regex>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        MATH_INDICATORS
            .iter()
            .map(|p| Regex::new(p).expect("math indicator pattern is valid"))
            .collect()
    })
}

/// Whether the content of a dollar-delimited span looks like math.
pub fn looks_mathematical(span: &str) -> bool {
    math_indicators().iter().any(|re| re.is_match(span))
}

/// Whether the text after a dollar amount carries it on as an expression.
fn continues_expression(rest: &str) -> bool {
    match rest.chars().next() {
        Some(c) if c.is_alphanumeric() || "_^=+-*/".contains(c) => true,
        Some(c) if c.is_whitespace() => rest
            .trim_start()
            .starts_with(['=', '+', '-', '*', '/', '^']),
        _ => false,
    }
}

/// Blank out dollar signs that denote money.
///
/// A `$` counts as currency before a MathML number or before a bare amount
/// that is not followed by more of an expression.
fn mask_currency(xml: &str) -> String {
    let tagged = static_regex!(r#"<span\s+class\s*=\s*["']currency["']\s*>\s*\$\s*</span>"#);
    let masked = blank_matches(xml, tagged);
    static_regex!(r"\$(<(?:m:)?math\b|<mn\b|\.\d+|\d+(?:[.,]\d+)*)")
        .replace_all(&masked, |caps: &regex::Captures<'_>| {
            let amount = &caps[1];
            let rest = caps.get(0).map_or("", |m| &masked[m.end()..]);
            if amount.starts_with('<') || !continues_expression(rest) {
                format!(" {amount}")
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

/// Reject LaTeX commands and dollar-delimited math.
pub fn check_no_latex(xml: &str, _ctx: &ValidationContext) -> Result<(), ValidationError> {
    if let Some(m) = static_regex!(r"\\(?:[A-Za-z]+|[()\[\]])").find(xml) {
        return Err(ValidationError::LatexCommand {
            command: m.as_str().to_string(),
            context: snippet(xml, m.start(), m.end()),
        });
    }

    let work = mask_currency(xml);
    for caps in static_regex!(r"\$([^$]+)\$").captures_iter(&work) {
        let Some(whole) = caps.get(0) else { continue };
        if looks_mathematical(&caps[1]) {
            return Err(ValidationError::LatexMath {
                span: xml[whole.range()].to_string(),
                context: snippet(xml, whole.start(), whole.end()),
            });
        }
    }
    Ok(())
}

/// The `<mrow>` equivalent of an `<mfenced>` with the given delimiters.
pub fn mfenced_replacement(open: &str, close: &str, separators: Option<&str>) -> String {
    let fence = |d: &str| {
        if d.is_empty() {
            String::new()
        } else {
            format!("<mo>{d}</mo>")
        }
    };
    let inner = match separators.and_then(|s| s.chars().find(|c| !c.is_whitespace())) {
        Some(sep) => format!("...<mo>{sep}</mo>..."),
        None => "...".to_string(),
    };
    format!("<mrow>{}{inner}{}</mrow>", fence(open), fence(close))
}

/// `<mfenced>` is deprecated in MathML Core.
pub fn check_no_mfenced(xml: &str, _ctx: &ValidationContext) -> Result<(), ValidationError> {
    let Some(caps) = static_regex!(r"<(?:m:)?mfenced\b([^>]*)>").captures(xml) else {
        return Ok(());
    };
    let attrs = caps.get(1).map_or("", |m| m.as_str());
    let open = attribute(attrs, "open").unwrap_or("(");
    let close = attribute(attrs, "close").unwrap_or(")");
    let separators = attribute(attrs, "separators");
    let (start, end) = caps.get(0).map_or((0, 0), |m| (m.start(), m.end()));

    Err(ValidationError::DeprecatedMfenced {
        open: open.to_string(),
        close: close.to_string(),
        separators: separators.map(str::to_string),
        replacement: mfenced_replacement(open, close, separators),
        context: snippet(xml, start, end),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rules::fixtures::*;

    #[test]
    fn backslash_commands_are_rejected() {
        for body in [r"<p>\frac{1}{2}</p>", r"<p>\(x\)</p>", r"<p>\[ y \]</p>"] {
            let err = check_no_latex(&item(body), &item_ctx()).unwrap_err();
            assert!(matches!(err, ValidationError::LatexCommand { .. }), "{body}");
        }
    }

    #[test]
    fn dollar_math_is_rejected() {
        for body in [
            "<p>Solve $x + 1 = 3$.</p>",
            "<p>Find $x^2$.</p>",
            "<p>Plot $(3, 4)$ now.</p>",
            "<p>Use $ 3/4 $ cup.</p>",
            "<p>Let $θ$ be the angle.</p>",
        ] {
            let err = check_no_latex(&item(body), &item_ctx()).unwrap_err();
            assert!(matches!(err, ValidationError::LatexMath { .. }), "{body}");
        }
    }

    #[test]
    fn currency_is_not_math() {
        for body in [
            "<p>It costs $5 and then $10 + tax.</p>",
            "<p>Pay $5 and $10 later.</p>",
            "<p>It was $4.50. Now it is $5.</p>",
            r#"<p><span class="currency">$</span><math><mn>3</mn></math> or $<mn>4</mn></p>"#,
            "<p>Between $ and $ there is nothing mathematical.</p>",
        ] {
            assert!(check_no_latex(&item(body), &item_ctx()).is_ok(), "{body}");
        }
    }

    #[test]
    fn dollar_span_starting_with_a_number_is_math() {
        for body in [
            "<p>Solve $2x+3=7$ for x.</p>",
            "<p>Simplify $3/4 + x^2$ now.</p>",
            "<p>Pay $3/4$ later</p>",
        ] {
            let err = check_no_latex(&item(body), &item_ctx()).unwrap_err();
            assert!(matches!(err, ValidationError::LatexMath { .. }), "{body}");
        }
    }

    #[test]
    fn amount_followed_by_an_operator_stays_unmasked() {
        assert!(continues_expression("x+3=7$"));
        assert!(continues_expression("/4 + x^2$"));
        assert!(continues_expression(" + x$"));
        assert!(!continues_expression(" and $10"));
        assert!(!continues_expression(". Now"));
        assert!(!continues_expression(""));
    }

    #[test]
    fn mfenced_defaults_to_parentheses() {
        let xml = item("<math><mfenced><mi>x</mi></mfenced></math>");
        let err = check_no_mfenced(&xml, &item_ctx()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains(r#"open="(""#), "{msg}");
        assert!(msg.contains("<mrow><mo>(</mo>...<mo>)</mo></mrow>"), "{msg}");
    }

    #[test]
    fn mfenced_echoes_custom_delimiters() {
        let xml = item(r#"<math><mfenced open="[" close="]" separators=";"><mi>a</mi><mi>b</mi></mfenced></math>"#);
        match check_no_mfenced(&xml, &item_ctx()).unwrap_err() {
            ValidationError::DeprecatedMfenced {
                open,
                close,
                separators,
                replacement,
                ..
            } => {
                assert_eq!((open.as_str(), close.as_str()), ("[", "]"));
                assert_eq!(separators.as_deref(), Some(";"));
                assert_eq!(replacement, "<mrow><mo>[</mo>...<mo>;</mo>...<mo>]</mo></mrow>");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
