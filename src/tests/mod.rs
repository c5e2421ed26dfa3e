use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use crate::{
    app::App,
    config::Config,
    scrape::{FetchError, Page, PageFetcher},
    storage::{BackendLocal, StorageManager},
};

mod app;

#[derive(Debug, Clone)]
enum Canned {
    Page(Page),
    Timeout,
    Status(u16),
}

/// In-memory `PageFetcher`. Unknown urls fail with a network error.
#[derive(Debug, Default)]
pub struct StubFetcher {
    pages: HashMap<String, Canned>,
    calls: AtomicUsize,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn html(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            Canned::Page(Page {
                content_type: Some("text/html; charset=utf-8".to_string()),
                body: body.to_string(),
            }),
        );
        self
    }

    pub fn typed(mut self, url: &str, content_type: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            Canned::Page(Page {
                content_type: Some(content_type.to_string()),
                body: String::new(),
            }),
        );
        self
    }

    pub fn timeout(mut self, url: &str) -> Self {
        self.pages.insert(url.to_string(), Canned::Timeout);
        self
    }

    pub fn status(mut self, url: &str, status: u16) -> Self {
        self.pages.insert(url.to_string(), Canned::Status(status));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PageFetcher for StubFetcher {
    fn fetch(&self, url: &str) -> Result<Page, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match self.pages.get(url) {
            Some(Canned::Page(page)) => Ok(page.clone()),
            Some(Canned::Timeout) => Err(FetchError::Timeout),
            Some(Canned::Status(status)) => Err(FetchError::Status(*status)),
            None => Err(FetchError::Network(format!("no route to {url}"))),
        }
    }
}

/// Creates an isolated App on a fresh temp directory.
/// The returned fetcher handle can be used to count page fetches.
pub fn create_app(fetcher: StubFetcher) -> (App, Arc<StubFetcher>, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let fetcher = Arc::new(fetcher);
    let app = open_app(tmp.path(), fetcher.clone());
    (app, fetcher, tmp)
}

/// Opens an App on an existing directory, e.g. to check what was persisted.
pub fn open_app(dir: &std::path::Path, fetcher: Arc<dyn PageFetcher>) -> App {
    let base_path = dir.to_str().expect("non utf8 temp dir");
    let config = Config::load_with(base_path).expect("failed to load config");
    let storage: Arc<dyn StorageManager> =
        Arc::new(BackendLocal::new(base_path).expect("failed to create storage"));

    App::new_with(config, storage, fetcher).expect("failed to open app")
}

pub fn page(title: &str, description: &str) -> String {
    format!(
        "<html><head><title>{title}</title>\
         <meta name=\"description\" content=\"{description}\"></head>\
         <body><p>ignored body text</p></body></html>"
    )
}
