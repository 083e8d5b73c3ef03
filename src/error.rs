use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid video link: {0}")]
    InvalidLink(String),

    #[error("Transcript unavailable: {0}")]
    Transcript(String),

    #[error("Summarizer API error: {0}")]
    SummarizerApi(String),

    #[error("{0}")]
    Voice(String),

    #[error("Audio playback error: {0}")]
    Playback(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
