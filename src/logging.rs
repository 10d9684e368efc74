// src/logging.rs
use crate::errors::ScraperError;
use chrono::Local;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

struct LocalTimestamp;

impl FormatTime for LocalTimestamp {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "[{}]", Local::now().format(TIMESTAMP_FORMAT))
    }
}

/// Installs the global subscriber: one console layer, one append-only file
/// layer at `log_path`. `RUST_LOG` overrides the default `info` filter.
pub fn init(log_path: &Path) -> Result<(), ScraperError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_timer(LocalTimestamp)
                .with_writer(std::io::stdout),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_timer(LocalTimestamp)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .map_err(|e| ScraperError::Config(format!("Logging already initialised: {e}")))?;

    Ok(())
}

/// Brackets a run with start/end markers in the log. The end marker is
/// written on drop, so it also lands when the run bails out with an error.
pub struct SessionLog {
    _private: (),
}

impl SessionLog {
    pub fn start() -> Self {
        tracing::info!(
            "=== Scraping session started at {} ===",
            Local::now().format(TIMESTAMP_FORMAT)
        );
        Self { _private: () }
    }
}

impl Drop for SessionLog {
    fn drop(&mut self) {
        tracing::info!(
            "=== Scraping session ended at {} ===",
            Local::now().format(TIMESTAMP_FORMAT)
        );
    }
}
