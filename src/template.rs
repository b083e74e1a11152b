//! HTML templates with escaped interpolation.
//!
//! Templates are static HTML files with `{{ name }}` placeholders. Values are
//! either plain text, which is HTML-escaped on the way in, or [`Markup`]
//! that was produced by this module and is inserted as-is. Data destined for
//! a `<script>` block goes through [`script_json`] so it can never close the
//! script element.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::Serialize;

use crate::error::VehicountError;

/// HTML that is safe to insert verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Markup(String);

impl Markup {
    /// Trust a string as HTML. Only for content built inside the crate.
    pub(crate) fn trusted(html: impl Into<String>) -> Self {
        Self(html.into())
    }

    /// The HTML source.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the HTML source.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for Markup {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// A value substituted into a template placeholder.
#[derive(Debug, Clone, Copy)]
pub enum Value<'a> {
    /// Plain text; escaped before insertion.
    Text(&'a str),
    /// Pre-built markup; inserted verbatim.
    Markup(&'a Markup),
}

/// Escape text for use in HTML element content and quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Serialize `value` as a JavaScript literal for an inline `<script>`.
///
/// `<`, `>`, `&` and the JavaScript line separators are written as `\uXXXX`
/// escapes, which keeps the JSON meaning while making `</script>` impossible.
///
/// # Errors
///
/// Returns [`VehicountError::TemplateError`] if serialization fails.
pub fn script_json<T: Serialize + ?Sized>(value: &T) -> Result<Markup, VehicountError> {
    let json = serde_json::to_string(value)
        .map_err(|error| VehicountError::TemplateError(format!("cannot serialize: {error}")))?;

    let mut escaped = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => escaped.push_str("\\u003c"),
            '>' => escaped.push_str("\\u003e"),
            '&' => escaped.push_str("\\u0026"),
            '\u{2028}' => escaped.push_str("\\u2028"),
            '\u{2029}' => escaped.push_str("\\u2029"),
            _ => escaped.push(c),
        }
    }
    Ok(Markup(escaped))
}

/// A static template with `{{ name }}` placeholders.
#[derive(Debug, Clone, Copy)]
pub struct Template {
    name: &'static str,
    source: &'static str,
}

impl Template {
    /// Wrap template source. `name` only appears in error messages.
    pub const fn new(name: &'static str, source: &'static str) -> Self {
        Self { name, source }
    }

    /// Substitute every placeholder.
    ///
    /// # Errors
    ///
    /// Returns [`VehicountError::TemplateError`] if a placeholder has no
    /// value or is never closed.
    pub fn render(&self, values: &[(&str, Value<'_>)]) -> Result<Markup, VehicountError> {
        let mut output = String::with_capacity(self.source.len());
        let mut rest = self.source;

        while let Some(open) = rest.find("{{") {
            output.push_str(&rest[..open]);
            let after_open = &rest[open + 2..];
            let close = after_open.find("}}").ok_or_else(|| {
                VehicountError::TemplateError(format!("unclosed placeholder in {}", self.name))
            })?;

            let key = after_open[..close].trim();
            let (_, value) = values
                .iter()
                .find(|(name, _)| *name == key)
                .ok_or_else(|| {
                    VehicountError::TemplateError(format!(
                        "no value for {{{{ {key} }}}} in {}",
                        self.name
                    ))
                })?;

            match value {
                Value::Text(text) => output.push_str(&escape_html(text)),
                Value::Markup(markup) => output.push_str(markup.as_str()),
            }
            rest = &after_open[close + 2..];
        }

        output.push_str(rest);
        Ok(Markup(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_text_values() {
        let template = Template::new("test", "<p title=\"{{ title }}\">{{body}}</p>");
        let rendered = template
            .render(&[
                ("title", Value::Text("\"quoted\" & 'single'")),
                ("body", Value::Text("<script>alert(1)</script>")),
            ])
            .unwrap();

        assert_eq!(
            rendered.as_str(),
            "<p title=\"&quot;quoted&quot; &amp; &#x27;single&#x27;\">&lt;script&gt;alert(1)&lt;/script&gt;</p>"
        );
    }

    #[test]
    fn inserts_markup_verbatim() {
        let inner = Markup::trusted("<b>7</b>");
        let rendered = Template::new("test", "<div>{{ inner }}</div>")
            .render(&[("inner", Value::Markup(&inner))])
            .unwrap();
        assert_eq!(rendered.to_string(), "<div><b>7</b></div>");
    }

    #[test]
    fn missing_or_unclosed_placeholders_fail() {
        let error = Template::new("page", "{{ nope }}").render(&[]).unwrap_err();
        assert!(error.to_string().contains("nope"));
        assert!(error.to_string().contains("page"));

        assert!(Template::new("page", "{{ open").render(&[]).is_err());
    }

    #[test]
    fn script_json_cannot_close_the_script() {
        let json = script_json(&["</script><script>alert(1)</script>"]).unwrap();
        assert!(!json.as_str().contains("</"));
        assert!(!json.as_str().contains('<'));

        let numbers = script_json(&[1u64, 2, 3]).unwrap();
        assert_eq!(numbers.as_str(), "[1,2,3]");
    }
}
