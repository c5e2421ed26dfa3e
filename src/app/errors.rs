#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("bookmark not found")]
    NotFound,

    #[error("unsupported url {0:?}: only http and https bookmarks are indexed")]
    InvalidUrl(String),

    #[error("unexpected error: {0:?}")]
    Other(#[from] anyhow::Error),
}
