//! Error types for diagram operations

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during diagram operations
#[derive(Error, Debug)]
pub enum DiagramError {
    /// The rendering backend could not be started
    #[error("Rendering backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The backend did not produce output in time
    #[error("Rendering timed out after {0:?}")]
    Timeout(Duration),

    /// The diagram source was rejected
    #[error("Invalid diagram source: {0}")]
    InvalidSource(String),

    /// Rendering failed inside the backend
    #[error("Rendering failed: {0}")]
    RenderFailed(String),

    /// SVG could not be turned into a raster image
    #[error("Rasterization failed: {0}")]
    Raster(String),

    /// The backend panicked
    #[error("Renderer panicked: {0}")]
    Panic(String),

    /// Rendering was cancelled before this diagram started
    #[error("Rendering cancelled")]
    Cancelled,

    /// Unknown theme name
    #[error("Unknown mermaid theme: {0}")]
    UnknownTheme(String),

    /// Unsupported image format
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// HTTP request error
    #[cfg(feature = "kroki")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned an error
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DiagramError {
    /// Whether repeating the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            DiagramError::Timeout(_) => true,
            DiagramError::ServerError { status, .. } => *status >= 500 || *status == 429,
            #[cfg(feature = "kroki")]
            DiagramError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

/// Result type for diagram operations
pub type Result<T> = std::result::Result<T, DiagramError>;
