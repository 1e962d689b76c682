//! Overlay error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by an [`OverlayBackend`](crate::backend::OverlayBackend).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Failed to create pipeline: {0}")]
    PipelineCreationFailed(String),
    #[error("Failed to begin render pass: {0}")]
    PassCreationFailed(String),
    #[error("Failed to upload vertex buffer: {0}")]
    BufferUploadFailed(String),
    #[error("Draw submission failed: {0}")]
    SubmissionFailed(String),
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Device lost")]
    DeviceLost,
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Errors surfaced by the overlay renderer.
#[derive(Error, Debug)]
pub enum OverlayError {
    /// A backend call failed while drawing or building a pipeline.
    #[error("{context}: {source}")]
    Backend {
        context: String,
        #[source]
        source: BackendError,
    },
    /// The config file could not be read.
    #[error("failed to read {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The config file is not valid TOML for [`OverlayConfig`](crate::config::OverlayConfig).
    #[error("failed to parse {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl OverlayError {
    pub(crate) fn backend(context: impl Into<String>, source: BackendError) -> Self {
        Self::Backend {
            context: context.into(),
            source,
        }
    }
}

pub type OverlayResult<T> = Result<T, OverlayError>;
