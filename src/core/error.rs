use thiserror::Error;

/// Errors surfaced by the client, the query cache and the feeds.
///
/// `Clone` so that one settled in-flight fetch can hand the same error to
/// every caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("Cached value for '{0}' has an unexpected type")]
    TypeMismatch(String),

    #[error("Background fetch failed: {0}")]
    TaskFailed(String),
}

impl ClientError {
    /// True for failures of the network round trip itself (including
    /// non-2xx answers), as opposed to bad input or local bookkeeping.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Status { .. })
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

impl<T> From<std::sync::PoisonError<T>> for ClientError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::Decode(err.to_string());
        }
        if let Some(status) = err.status() {
            return Self::Status {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            };
        }
        if err.is_builder() {
            return Self::Config(err.to_string());
        }
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
