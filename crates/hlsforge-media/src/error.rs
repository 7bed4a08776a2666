//! Error types for hlsforge-media.

use std::io;
use thiserror::Error;

/// Result type for hlsforge-media operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for hlsforge-media operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The source does not exist or could not be opened.
    #[error("Source unavailable: {source_id}")]
    SourceUnavailable { source_id: String },

    /// No complete moov box was found within the read budget.
    #[error("Moov atom not found after reading up to {budget} bytes")]
    MoovNotFound { budget: usize },

    /// A requested video/audio track index does not exist.
    #[error("Requested {kind} track #{index} does not exist")]
    TrackNotFound { kind: &'static str, index: u32 },

    /// A remote read failed and could not be recovered.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Invalid MP4 file structure.
    #[error("Invalid MP4: {0}")]
    InvalidMp4(String),

    /// Unsupported feature or codec.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Invalid segment index.
    #[error("Invalid segment index: {index} (count: {count})")]
    InvalidSegmentIndex { index: usize, count: usize },
}

impl Error {
    /// Create a source unavailable error.
    pub fn source_unavailable(source_id: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            source_id: source_id.into(),
        }
    }

    /// Create an invalid MP4 error.
    pub fn invalid_mp4(msg: impl Into<String>) -> Self {
        Self::InvalidMp4(msg.into())
    }

    /// Create an unsupported error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Whether this error means the source itself could not be used
    /// (as opposed to a bad request against a parsed source).
    pub fn is_source_failure(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable { .. } | Self::MoovNotFound { .. } | Self::Io(_)
        )
    }
}
