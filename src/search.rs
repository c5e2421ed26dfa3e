use crate::bookmarks::BookmarkRecord;

/// Case-insensitive containment against title, url and every keyword.
pub fn matches(record: &BookmarkRecord, query_lower: &str) -> bool {
    record.title.to_lowercase().contains(query_lower)
        || record.url.to_lowercase().contains(query_lower)
        || record
            .keywords
            .iter()
            .any(|keyword| keyword.to_lowercase().contains(query_lower))
}

/// Matching records in iteration order, at most `limit` of them.
///
/// An empty query is a substring of everything and therefore matches every
/// record; callers that want an empty state for blank input decide that
/// themselves.
pub fn search<'a>(
    query: &str,
    records: impl IntoIterator<Item = &'a BookmarkRecord>,
    limit: usize,
) -> Vec<&'a BookmarkRecord> {
    let query = query.to_lowercase();

    records
        .into_iter()
        .filter(|record| matches(record, &query))
        .take(limit)
        .collect()
}
