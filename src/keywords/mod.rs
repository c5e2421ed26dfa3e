//! Keyword extraction for a single bookmarked url.
//!
//! Html pages are reduced to their signal text (see [`html`]), tokenized,
//! stop-word filtered and ranked by frequency. Anything else is tagged with
//! its content subtype. Failures never escape: they become
//! [`Extraction::Failed`] so one bad bookmark cannot abort a batch.

mod html;
mod stopwords;

use std::{collections::HashMap, sync::Arc};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::scrape::PageFetcher;

pub use html::signal_text;
pub use stopwords::is_stop_word;

pub const MAX_KEYWORDS: usize = 10;
pub const EXTRACTION_FAILED: &str = "EXTRACTION_FAILED";

static WORD_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\w{3,15}\b").expect("valid word regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Keywords(Vec<String>),
    /// Uppercased content subtype of a non-html resource, e.g. `PDF`.
    FileType(String),
    Failed(String),
}

impl Extraction {
    pub fn keywords(&self) -> Vec<String> {
        match self {
            Extraction::Keywords(keywords) => keywords.clone(),
            Extraction::FileType(tag) => vec![tag.clone()],
            Extraction::Failed(_) => vec![EXTRACTION_FAILED.to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Other(String),
}

impl ContentKind {
    pub fn is_html(&self) -> bool {
        matches!(self, ContentKind::Html)
    }
}

/// A missing content type is assumed to be html.
pub fn classify(content_type: Option<&str>) -> ContentKind {
    let mime = content_type
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_lowercase())
        .unwrap_or_default();

    if mime.is_empty() || mime == "text/html" || mime == "application/xhtml+xml" {
        return ContentKind::Html;
    }

    let subtype = mime.split_once('/').map(|(_, sub)| sub).unwrap_or(&mime);
    ContentKind::Other(subtype.to_uppercase())
}

/// Frequency-ranked keywords, ties broken by first appearance.
pub fn rank_keywords(text: &str) -> Vec<String> {
    let text = text.to_lowercase();

    // word -> (count, first position)
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    let words = WORD_REGEX
        .find_iter(&text)
        .map(|m| m.as_str())
        .filter(|word| !is_stop_word(word));

    for (position, word) in words.enumerate() {
        counts.entry(word).or_insert((0, position)).0 += 1;
    }

    let mut ranked = counts.into_iter().collect::<Vec<_>>();
    ranked.sort_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
        count_b.cmp(count_a).then(first_a.cmp(first_b))
    });

    ranked
        .into_iter()
        .take(MAX_KEYWORDS)
        .map(|(word, _)| word.to_string())
        .collect()
}

pub struct KeywordExtractor {
    fetcher: Arc<dyn PageFetcher>,
}

impl KeywordExtractor {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }

    pub fn extract(&self, url: &str) -> Extraction {
        let page = match self.fetcher.fetch(url) {
            Ok(page) => page,
            Err(err) => {
                log::warn!("failed to index {url}: {err}");
                return Extraction::Failed(err.to_string());
            }
        };

        match classify(page.content_type.as_deref()) {
            ContentKind::Html => {
                let keywords = rank_keywords(&signal_text(&page.body));
                log::debug!("{url}: {} keywords", keywords.len());
                Extraction::Keywords(keywords)
            }
            ContentKind::Other(tag) => {
                log::debug!("{url}: tagged as {tag}");
                Extraction::FileType(tag)
            }
        }
    }
}
