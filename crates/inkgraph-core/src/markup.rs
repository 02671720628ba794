//! Trusted markup produced from stored post content.
//!
//! Content is stored as plain text with embedded newlines. Before it reaches
//! a template, line breaks are turned into `<br>` tags. Nothing else is
//! escaped: the result is marked as trusted so the rendering side must not
//! escape it again.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Line-break tag emitted for every newline in the source text.
pub const LINE_BREAK: &str = "<br>";

/// HTML that templates should emit verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Markup(String);

impl Markup {
    /// Convert newline-delimited text into markup with explicit line breaks.
    ///
    /// `\r\n` and `\n` both count as one break.
    pub fn from_text(text: &str) -> Self {
        let mut out = String::with_capacity(text.len() + 8);
        let mut lines = text.split('\n').peekable();
        while let Some(line) = lines.next() {
            out.push_str(line.strip_suffix('\r').unwrap_or(line));
            if lines.peek().is_some() {
                out.push_str(LINE_BREAK);
            }
        }
        Self(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Markup {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newlines_become_breaks() {
        let m = Markup::from_text("first\nsecond\n\nthird");
        assert_eq!(m.as_str(), "first<br>second<br><br>third");
    }

    #[test]
    fn crlf_counts_as_one_break() {
        let m = Markup::from_text("a\r\nb");
        assert_eq!(m.as_str(), "a<br>b");
    }

    #[test]
    fn text_without_newlines_is_unchanged() {
        let m = Markup::from_text("no <em>breaks</em> here");
        assert_eq!(m.as_str(), "no <em>breaks</em> here");
    }

    #[test]
    fn trailing_newline_keeps_trailing_break() {
        assert_eq!(Markup::from_text("end\n").as_str(), "end<br>");
        assert_eq!(Markup::from_text("").as_str(), "");
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&Markup::from_text("a\nb")).unwrap();
        assert_eq!(json, "\"a<br>b\"");
    }
}
