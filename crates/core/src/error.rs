use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid response from {endpoint}: {details}")]
    BackendResponse { endpoint: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unsupported file type: {0}")]
    UnsupportedFile(String),

    #[error("request cancelled: {0}")]
    Cancelled(String),
}

impl SyncError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

#[derive(Debug, Error)]
pub enum OpenError {
    #[error("document url is missing")]
    MissingUrl,

    #[error("document url is invalid: {url} ({reason})")]
    InvalidUrl { url: String, reason: url::ParseError },

    #[error("failed to launch viewer: {0}")]
    Launch(String),
}

pub type Result<T, E = SyncError> = std::result::Result<T, E>;
