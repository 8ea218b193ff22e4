//! Search result highlighting.
//!
//! Matches are found in the raw text, then every segment is HTML-escaped on
//! its own. Escaping first and matching afterwards would let a query such as
//! `amp` match inside `&amp;` and split the entity.

use regex::RegexBuilder;

const HIGHLIGHT_OPEN: &str = r#"<span class="highlight">"#;
const HIGHLIGHT_CLOSE: &str = "</span>";

/// Escape the five HTML metacharacters `& < > " '`.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Escape `text` and wrap each case-insensitive literal occurrence of
/// `query` in a highlight span.
///
/// An empty or whitespace-only query highlights nothing.
///
/// ```
/// use terroir_storefront::search::highlight;
///
/// assert_eq!(highlight("Apple", "ap"), r#"<span class="highlight">Ap</span>ple"#);
/// assert_eq!(highlight("<b>", "b"), r#"&lt;<span class="highlight">b</span>&gt;"#);
/// ```
#[must_use]
pub fn highlight(text: &str, query: &str) -> String {
    let needle = query.trim();
    if needle.is_empty() {
        return escape_html(text);
    }

    let Ok(pattern) = RegexBuilder::new(&regex::escape(needle))
        .case_insensitive(true)
        .build()
    else {
        return escape_html(text);
    };

    let mut out = String::with_capacity(text.len() + 32);
    let mut last = 0;
    for found in pattern.find_iter(text) {
        out.push_str(&escape_html(&text[last..found.start()]));
        out.push_str(HIGHLIGHT_OPEN);
        out.push_str(&escape_html(found.as_str()));
        out.push_str(HIGHLIGHT_CLOSE);
        last = found.end();
    }
    out.push_str(&escape_html(&text[last..]));
    out
}
