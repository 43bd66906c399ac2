use thiserror::Error;

/// Errors surfaced by the sync engine and its collaborators.
///
/// Per-series conditions (no fully-watched episode, no remote match, a
/// single failed update) are never errors; they are rows in the run
/// report. Only whole-request conditions end up here.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("invalid access token")]
    InvalidToken,

    #[error("rate limited")]
    RateLimited,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("history source error: {0}")]
    History(String),

    #[error("cache error: {0}")]
    Cache(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
