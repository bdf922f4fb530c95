//! Error types for the browser layer

use thiserror::Error;
use uiprobe_core::HandleError;

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("node not found on PATH")]
    NodeNotFound,

    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Driver did not report ready within {0} ms")]
    DriverStartup(u64),

    #[error("Server failed to start: {0}")]
    ServerStartup(String),

    #[error("Server readiness check failed after {0} attempts")]
    ServerHealthCheck(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type BrowserResult<T> = Result<T, BrowserError>;

impl From<BrowserError> for HandleError {
    fn from(err: BrowserError) -> Self {
        match err {
            BrowserError::Json(e) => HandleError::Protocol(e.to_string()),
            BrowserError::Io(_) => HandleError::SessionClosed,
            other => HandleError::Driver(other.to_string()),
        }
    }
}
