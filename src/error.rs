#[derive(Debug, thiserror::Error)]
pub enum CollectionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Remote store returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("No user is signed in")]
    Unauthenticated,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Localization is already initialized")]
    AlreadyInitialized,
}

impl CollectionError {
    /// Whether repeating the same request could succeed: transport
    /// failures, throttling, and server-side errors.
    pub fn is_transient(&self) -> bool {
        match self {
            CollectionError::Http(e) => !e.is_decode() && !e.is_builder(),
            CollectionError::Remote { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, CollectionError>;
