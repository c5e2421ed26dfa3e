use std::sync::{Arc, OnceLock, Weak};

use crate::app::{App, AppError, EventOutcome, Message, Reply};
use crate::bookmarks::Status;
use crate::keywords::Extraction;
use crate::scrape::{FetchError, Page, PageFetcher};
use crate::tests::{create_app, open_app, page, StubFetcher};
use crate::tree::{BookmarkEvent, BookmarkNode, LiveBookmark};

fn live(url: &str, title: &str) -> LiveBookmark {
    LiveBookmark {
        title: title.to_string(),
        url: url.to_string(),
    }
}

fn leaf(url: &str, title: &str) -> BookmarkNode {
    BookmarkNode {
        id: url.to_string(),
        title: title.to_string(),
        url: Some(url.to_string()),
        children: None,
    }
}

fn fetcher() -> StubFetcher {
    StubFetcher::new()
        .html("http://a.com", &page("Rust", "ownership borrowing lifetimes"))
        .html("http://b.com", &page("Axum", "web framework routing"))
        .html("http://c.com", &page("Rayon", "data parallelism"))
}

#[test]
fn test_events_ignored_before_first_sync() {
    let (app, fetcher, _tmp) = create_app(fetcher());

    let outcome = app
        .handle_event(BookmarkEvent::Created {
            node: leaf("http://a.com", "A"),
        })
        .unwrap();

    assert_eq!(outcome, EventOutcome::Ignored);
    assert_eq!(fetcher.calls(), 0);
    assert!(app.records().is_empty());
}

#[test]
fn test_created_event_indexes_bookmark() {
    let (app, _fetcher, _tmp) = create_app(fetcher());
    app.full_sync(vec![], &|_| {}).unwrap();

    let outcome = app
        .handle_event(BookmarkEvent::Created {
            node: leaf("http://a.com", "A"),
        })
        .unwrap();

    assert_eq!(
        outcome,
        EventOutcome::Indexed {
            urls: vec!["http://a.com".to_string()]
        }
    );
    let record = &app.records()["http://a.com"];
    assert_eq!(record.status, Status::Success);
    assert!(record.keywords.contains(&"ownership".to_string()));
}

#[test]
fn test_created_event_skips_unsupported_url() {
    let (app, fetcher, _tmp) = create_app(fetcher());
    app.full_sync(vec![], &|_| {}).unwrap();

    let outcome = app
        .handle_event(BookmarkEvent::Created {
            node: leaf("chrome://extensions", "Extensions"),
        })
        .unwrap();

    assert_eq!(outcome, EventOutcome::Indexed { urls: vec![] });
    assert_eq!(fetcher.calls(), 0);
    assert!(app.records().is_empty());
}

#[test]
fn test_changed_event_updates_title() {
    let (app, _fetcher, _tmp) = create_app(fetcher());
    app.full_sync(vec![live("http://a.com", "Old")], &|_| {}).unwrap();

    app.handle_event(BookmarkEvent::Changed {
        url: "http://a.com".to_string(),
        title: "New".to_string(),
    })
    .unwrap();

    let record = &app.records()["http://a.com"];
    assert_eq!(record.title, "New");
    assert_eq!(record.status, Status::Success);
}

#[test]
fn test_removed_folder_event_removes_descendants() {
    let (app, _fetcher, _tmp) = create_app(fetcher());
    app.full_sync(
        vec![
            live("http://a.com", "A"),
            live("http://b.com", "B"),
            live("http://c.com", "C"),
        ],
        &|_| {},
    )
    .unwrap();

    let folder = BookmarkNode {
        id: "folder".to_string(),
        title: "Dev".to_string(),
        url: None,
        children: Some(vec![leaf("http://a.com", "A"), leaf("http://b.com", "B")]),
    };
    let outcome = app
        .handle_event(BookmarkEvent::Removed { node: folder })
        .unwrap();

    assert_eq!(outcome, EventOutcome::Removed { count: 2 });
    assert_eq!(
        app.records().into_keys().collect::<Vec<_>>(),
        vec!["http://c.com"]
    );
}

#[test]
fn test_index_bookmarks_never_leaves_indexing() {
    let stub = fetcher().timeout("http://slow.example");
    let (app, _fetcher, _tmp) = create_app(stub);
    app.import(vec![live("http://a.com", "A"), live("http://slow.example", "Slow")])
        .unwrap();

    let report = app
        .index_bookmarks(&[
            "http://a.com".to_string(),
            "http://slow.example".to_string(),
            "http://missing.example".to_string(),
        ])
        .unwrap();

    assert_eq!(report.indexed, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.missing, 1);

    let records = app.records();
    assert!(records.values().all(|record| record.status != Status::Indexing));
    assert_eq!(records["http://slow.example"].status, Status::Failed);
    assert!(records["http://slow.example"]
        .status_text()
        .starts_with("Failed: "));
    assert!(!records.contains_key("http://missing.example"));
}

#[test]
fn test_update_keywords_unknown_url() {
    let (app, _fetcher, _tmp) = create_app(fetcher());

    let result = app.update_keywords("http://nope.com", vec!["x".to_string()]);

    assert!(matches!(result, Err(AppError::NotFound)));
    assert!(app.records().is_empty());
}

#[test]
fn test_handle_messages() {
    let (app, _fetcher, _tmp) = create_app(fetcher());
    app.full_sync(vec![live("http://a.com", "A"), live("http://b.com", "B")], &|_| {})
        .unwrap();

    let reply = app.handle(Message::UpdateKeywords {
        url: "http://a.com".to_string(),
        keywords: vec!["custom".to_string()],
    });
    assert_eq!(reply, Reply::ok());
    assert_eq!(app.records()["http://a.com"].keywords, vec!["custom"]);

    let reply = app.handle(Message::UpdateKeywords {
        url: "http://gone.com".to_string(),
        keywords: vec![],
    });
    assert!(!reply.success);
    assert!(reply.error.is_some());

    let reply = app.handle(Message::DeleteBookmarks {
        urls: vec![
            "http://a.com".to_string(),
            "http://b.com".to_string(),
            "http://never.com".to_string(),
        ],
    });
    assert_eq!(reply.deleted_count, Some(2));
    assert!(app.records().is_empty());
}

#[test]
fn test_suggest_formats_and_limits() {
    let (app, _fetcher, _tmp) = create_app(fetcher());
    app.full_sync(
        vec![
            live("http://a.com", "Rust & <Friends>"),
            live("http://b.com", "B"),
        ],
        &|_| {},
    )
    .unwrap();

    assert!(app.suggest("   ").is_empty());

    let suggestions = app.suggest("ownership");
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].content, "http://a.com");
    assert!(suggestions[0]
        .description
        .starts_with("<url>Rust &amp; &lt;Friends&gt;</url> - http://a.com"));

    app.import(sites(15)).unwrap();
    assert_eq!(app.suggest("site").len(), app.config().search_limit);
}

fn sites(count: usize) -> Vec<LiveBookmark> {
    (0..count)
        .map(|i| live(&format!("http://site{i:02}.example"), &format!("site {i}")))
        .collect()
}

#[test]
fn test_search_is_capped_by_config() {
    let (app, _fetcher, _tmp) = create_app(fetcher());
    app.import(sites(25)).unwrap();

    let found = app.search("site", None);
    assert_eq!(found.len(), 10);
    assert_eq!(found.len(), app.config().search_limit);

    assert_eq!(app.search("site", Some(3)).len(), 3);
    assert_eq!(app.search("site", Some(100)).len(), 25);
    assert_eq!(app.search("", None).len(), 10);
}

/// Deletes `url` through the app the moment its page is requested.
struct DeletingFetcher {
    app: OnceLock<Weak<App>>,
    url: String,
}

impl PageFetcher for DeletingFetcher {
    fn fetch(&self, url: &str) -> Result<Page, FetchError> {
        if url == self.url {
            if let Some(app) = self.app.get().and_then(Weak::upgrade) {
                assert_eq!(app.delete_bookmarks(&[url.to_string()]).unwrap(), 1);
            }
        }

        Ok(Page {
            content_type: Some("text/html".to_string()),
            body: page("Deleted", "removed while fetching"),
        })
    }
}

fn deleting_app(url: &str) -> (Arc<App>, tempfile::TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(DeletingFetcher {
        app: OnceLock::new(),
        url: url.to_string(),
    });
    let app = Arc::new(open_app(tmp.path(), fetcher.clone()));
    fetcher.app.set(Arc::downgrade(&app)).ok();
    (app, tmp)
}

#[test]
fn test_reindex_does_not_resurrect_deleted_bookmark() {
    let (app, tmp) = deleting_app("http://gone.com");
    app.import(vec![live("http://gone.com", "Gone"), live("http://kept.com", "Kept")])
        .unwrap();

    let report = app
        .index_bookmarks(&["http://gone.com".to_string(), "http://kept.com".to_string()])
        .unwrap();

    assert_eq!(report.missing, 1);
    assert_eq!(report.indexed, 1);
    assert!(app.record("http://gone.com").is_none());
    assert_eq!(app.record("http://kept.com").unwrap().status, Status::Success);

    let raw = std::fs::read_to_string(tmp.path().join("index.json")).unwrap();
    assert!(!raw.contains("http://gone.com"));
}

#[test]
fn test_created_event_does_not_resurrect_deleted_bookmark() {
    let (app, _tmp) = deleting_app("http://gone.com");
    app.full_sync(vec![], &|_| {}).unwrap();

    let outcome = app
        .handle_event(BookmarkEvent::Created {
            node: leaf("http://gone.com", "Gone"),
        })
        .unwrap();

    assert_eq!(outcome, EventOutcome::Indexed { urls: vec![] });
    assert!(app.records().is_empty());
}

#[test]
fn test_reindex_of_deleted_bookmark_is_missing() {
    let (app, _fetcher, _tmp) = create_app(fetcher());
    app.import(vec![live("http://a.com", "A")]).unwrap();
    app.delete_bookmarks(&["http://a.com".to_string()]).unwrap();

    let report = app.index_bookmarks(&["http://a.com".to_string()]).unwrap();

    assert_eq!(report.missing, 1);
    assert!(app.records().is_empty());
}

#[test]
fn test_import_replaces_index() {
    let (app, fetcher, _tmp) = create_app(fetcher());
    app.full_sync(vec![live("http://c.com", "C")], &|_| {}).unwrap();

    let count = app
        .import(vec![
            live("http://a.com", "A"),
            live("ftp://files.example", "Files"),
        ])
        .unwrap();

    assert_eq!(count, 1);
    assert_eq!(fetcher.calls(), 1);
    let records = app.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records["http://a.com"].status, Status::NotIndexed);
}

#[test]
fn test_extract_rejects_unsupported_url() {
    let (app, _fetcher, _tmp) = create_app(fetcher());

    assert!(matches!(
        app.extract("about:blank"),
        Err(AppError::InvalidUrl(_))
    ));
    assert!(matches!(
        app.extract("http://a.com"),
        Ok(Extraction::Keywords(_))
    ));
}
