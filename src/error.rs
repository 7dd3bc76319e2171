use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed price sample at index {index}: {reason}")]
    MalformedSample { index: usize, reason: String },

    #[error("{0} lock poisoned")]
    LockPoisoned(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
