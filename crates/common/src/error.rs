//! Error types shared across Capburn crates.

use std::path::PathBuf;

/// Top-level error type for Capburn operations.
#[derive(Debug, thiserror::Error)]
pub enum CapburnError {
    /// Source media could not be opened, probed, or prepared for decode,
    /// or no supported encoder was available.
    #[error("Acquisition error: {message}")]
    Acquisition { message: String },

    /// Playback or decode failed after the export started.
    #[error("Playback error: {message}")]
    Playback { message: String },

    /// The encoder rejected a frame or failed to finalize.
    #[error("Encode error: {message}")]
    Encode { message: String },

    /// Frame composition failed (font loading, raster setup).
    #[error("Render error: {message}")]
    Render { message: String },

    /// Caption document could not be loaded or saved.
    #[error("Document error: {message}")]
    Document { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    /// The caller requested cancellation. Not a failure: partial output is
    /// discarded and callers are expected to settle silently.
    #[error("Export cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using CapburnError.
pub type CapburnResult<T> = Result<T, CapburnError>;

impl CapburnError {
    pub fn acquisition(msg: impl Into<String>) -> Self {
        Self::Acquisition {
            message: msg.into(),
        }
    }

    pub fn playback(msg: impl Into<String>) -> Self {
        Self::Playback {
            message: msg.into(),
        }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn document(msg: impl Into<String>) -> Self {
        Self::Document {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether this outcome is a caller-requested cancellation rather than
    /// a failure. The two must stay distinguishable at the API boundary.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
