//! Address-bar suggestions.
//!
//! The suggestion host renders `description` as a small markup dialect
//! (`<url>`, `<dim>`, `<b>`), so every piece of bookmark data is escaped
//! before it is embedded.

use serde::{Deserialize, Serialize};

use crate::bookmarks::BookmarkRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Text that replaces the address bar input when picked.
    pub content: String,
    pub description: String,
}

pub fn escape_markup(unsafe_text: &str) -> String {
    let mut out = String::with_capacity(unsafe_text.len());
    for c in unsafe_text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            c => out.push(c),
        }
    }
    out
}

pub fn format_suggestion(record: &BookmarkRecord) -> Suggestion {
    let title = if record.title.is_empty() {
        &record.url
    } else {
        &record.title
    };

    let keywords = if record.keywords.is_empty() {
        String::new()
    } else {
        format!(" (Keywords: {})", escape_markup(&record.keywords.join(", ")))
    };

    Suggestion {
        content: record.url.clone(),
        description: format!(
            "<url>{}</url> - {}{keywords}",
            escape_markup(title),
            escape_markup(&record.url)
        ),
    }
}

pub fn format_suggestions(matches: &[BookmarkRecord]) -> Vec<Suggestion> {
    matches.iter().map(format_suggestion).collect()
}
