// src/errors.rs
use thiserror::Error;

/// Errors raised anywhere between the browser and the files on disk.
///
/// Most of these never reach `main`: the crawler logs and skips the listing or
/// query that produced them. Only sink and setup failures end a run.
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Invalid selector '{selector}': {reason}")]
    Selector { selector: String, reason: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScraperError {
    pub fn browser(e: impl std::fmt::Display) -> Self {
        ScraperError::Browser(e.to_string())
    }
}
