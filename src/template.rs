//! Placeholder templates for the wrapper and source pages.
//!
//! The page shells are plain HTML files under `static/`, embedded at compile
//! time. They use two kinds of placeholder:
//!
//! ```text
//! {{key}}                  replaced by the value of `key`, or nothing
//! {{#key}}...{{/key}}      inner text kept only when `key` is non-empty
//! ```
//!
//! Sections are resolved first, then tokens, so a section body may contain
//! tokens. An opening tag without its matching close is left untouched.
//! Values are inserted verbatim; callers escape with [`escape`] first.

use std::collections::BTreeMap;

/// Shell for `q/<id>/index.html`.
pub const WRAPPER_TEMPLATE: &str = include_str!("../static/wrapper.html");

/// Shell for `sources/<domain>/<slug>/index.html`.
pub const SOURCE_TEMPLATE: &str = include_str!("../static/source.html");

/// Values keyed by placeholder name.
pub type Payload = BTreeMap<&'static str, String>;

/// Fill a template with payload values.
pub fn apply(template: &str, data: &Payload) -> String {
    substitute_tokens(&resolve_sections(template, data), data)
}

/// HTML-escape a value for use in text or a double-quoted attribute.
pub fn escape(value: &str) -> String {
    maud::html! { (value) }.into_string()
}

fn resolve_sections(input: &str, data: &Payload) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("{{#") {
        let after_open = &rest[start + 3..];
        let matched = read_key(after_open).and_then(|(key, body)| {
            let close = format!("{{{{/{key}}}}}");
            body.find(&close)
                .map(|end| (key, &body[..end], &body[end + close.len()..]))
        });

        match matched {
            Some((key, inner, after_close)) => {
                out.push_str(&rest[..start]);
                if data.get(key).is_some_and(|v| !v.is_empty()) {
                    out.push_str(&resolve_sections(inner, data));
                }
                rest = after_close;
            }
            None => {
                out.push_str(&rest[..start + 3]);
                rest = after_open;
            }
        }
    }

    out.push_str(rest);
    out
}

fn substitute_tokens(input: &str, data: &Payload) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        match read_key(after_open) {
            Some((key, after_token)) => {
                if let Some(value) = data.get(key) {
                    out.push_str(value);
                }
                rest = after_token;
            }
            None => {
                out.push_str("{{");
                rest = after_open;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Read a `\w+` key followed by `}}`. Returns the key and the text after the
/// closing braces.
fn read_key(s: &str) -> Option<(&str, &str)> {
    let len = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(s.len());
    if len == 0 {
        return None;
    }
    let rest = s[len..].strip_prefix("}}")?;
    Some((&s[..len], rest))
}
