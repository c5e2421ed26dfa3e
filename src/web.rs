use crate::{
    app::{App, AppError, EventOutcome, Message, Reply},
    bookmarks::{BookmarkRecord, IndexMap},
    suggest::Suggestion,
    sync::SyncReport,
    tree::{flatten, BookmarkEvent, BookmarkNode},
};
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::signal;

#[derive(Clone)]
struct SharedState {
    app: Arc<App>,
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {err}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => log::error!("failed to install signal handler: {err}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::warn!("shutting down");
}

pub fn router(app: Arc<App>) -> Router {
    let shared_state = Arc::new(SharedState { app });

    Router::new()
        .route("/api/message", post(message))
        .route("/api/search", post(search))
        .route("/api/suggest", get(suggest))
        .route("/api/sync", post(sync))
        .route("/api/events", post(event))
        .route("/api/bookmarks", get(bookmarks))
        .route("/api/bookmark", get(bookmark))
        .route("/api/extract", get(extract))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(shared_state)
}

async fn start_app(app: Arc<App>) -> anyhow::Result<()> {
    let addr = app.config().listen_addr.clone();
    let router = router(app);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("listening on {addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub fn start_daemon(app: App) -> anyhow::Result<()> {
    let app = Arc::new(app);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(start_app(app))
}

#[derive(Debug)]
struct HttpError(AppError);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.0 {
            AppError::NotFound => axum::http::StatusCode::NOT_FOUND,
            AppError::InvalidUrl(_) => axum::http::StatusCode::BAD_REQUEST,
            AppError::Other(_) => {
                log::error!("{self:?}");
                axum::http::StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({"error": self.0.to_string()}))).into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

/// UI messages always answer 200 with `{success, ...}`.
async fn message(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<Message>,
) -> Json<Reply> {
    let app = state.app.clone();
    log::debug!("message: {payload:?}");

    tokio::task::block_in_place(move || Json(app.handle(payload)))
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

async fn search(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<SearchRequest>,
) -> Json<Vec<BookmarkRecord>> {
    let app = state.app.clone();

    tokio::task::block_in_place(move || Json(app.search(&payload.query, payload.limit)))
}

#[derive(Debug, Deserialize)]
pub struct SuggestParams {
    #[serde(default)]
    pub text: String,
}

async fn suggest(
    State(state): State<Arc<SharedState>>,
    Query(params): Query<SuggestParams>,
) -> Json<Vec<Suggestion>> {
    let app = state.app.clone();

    tokio::task::block_in_place(move || Json(app.suggest(&params.text)))
}

async fn sync(
    State(state): State<Arc<SharedState>>,
    Json(nodes): Json<Vec<BookmarkNode>>,
) -> Result<Json<SyncReport>, HttpError> {
    let app = state.app.clone();
    let live = flatten(&nodes);

    tokio::task::block_in_place(move || {
        app.full_sync(live, &|url| log::debug!("indexed {url}"))
            .map(Json)
            .map_err(Into::into)
    })
}

async fn event(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<BookmarkEvent>,
) -> Result<Json<EventOutcome>, HttpError> {
    let app = state.app.clone();

    tokio::task::block_in_place(move || app.handle_event(payload).map(Json).map_err(Into::into))
}

async fn bookmarks(State(state): State<Arc<SharedState>>) -> Json<IndexMap> {
    let app = state.app.clone();

    tokio::task::block_in_place(move || Json(app.records()))
}

#[derive(Debug, Deserialize)]
pub struct UrlParams {
    pub url: String,
}

async fn bookmark(
    State(state): State<Arc<SharedState>>,
    Query(params): Query<UrlParams>,
) -> Result<Json<BookmarkRecord>, HttpError> {
    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        app.record(&params.url)
            .map(Json)
            .ok_or(HttpError(AppError::NotFound))
    })
}

async fn extract(
    State(state): State<Arc<SharedState>>,
    Query(params): Query<UrlParams>,
) -> Result<Json<Vec<String>>, HttpError> {
    let app = state.app.clone();

    tokio::task::block_in_place(move || -> Result<_, HttpError> {
        let extraction = app.extract(&params.url)?;
        Ok(Json(extraction.keywords()))
    })
}
