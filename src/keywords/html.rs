//! Pulls the text that carries search signal out of an html document.
//!
//! The structural path reads `<title>`, the description meta tag and every
//! `<h1>`. Pages without any of those fall back to the text of `<body>` with
//! scripts, styles and tags removed.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("valid title selector"));
static META_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta").expect("valid meta selector"));
static H1_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").expect("valid h1 selector"));

static SCRIPT_STYLE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>|<!--.*?-->")
        .expect("valid script/style regex")
});
static BODY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<body[^>]*>(.*)</body>").expect("valid body regex"));
static TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));

pub fn signal_text(html: &str) -> String {
    let structural = structural_text(html);
    if !structural.trim().is_empty() {
        return structural;
    }

    log::debug!("no title, description or h1 found, using body text");
    body_text(html)
}

fn structural_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut parts: Vec<String> = vec![];

    if let Some(title) = document.select(&TITLE_SELECTOR).next() {
        parts.push(title.text().collect::<String>());
    }

    let description = document.select(&META_SELECTOR).find_map(|element| {
        let name = element.attr("name").unwrap_or_default();
        if name.eq_ignore_ascii_case("description") {
            element.attr("content").map(String::from)
        } else {
            None
        }
    });
    if let Some(description) = description {
        parts.push(description);
    }

    for heading in document.select(&H1_SELECTOR) {
        parts.push(heading.text().collect::<Vec<_>>().join(" "));
    }

    parts.join(" ")
}

/// Degraded path for pages without structural signal.
pub fn body_text(html: &str) -> String {
    let cleaned = SCRIPT_STYLE_REGEX.replace_all(html, " ");

    let body = match BODY_REGEX.captures(&cleaned) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or_default().to_string(),
        None => cleaned.to_string(),
    };

    TAG_REGEX.replace_all(&body, " ").to_string()
}
