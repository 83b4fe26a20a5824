//! Error types for the compositor.
//!
//! Every render error is scoped to one request: it terminates that request
//! with a failure outcome and never stops the render lane.

use cabbage_core::PixelFormat;
use thiserror::Error;

/// Why a single composition request failed.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The render context's buffer pool has no free buffer.
    #[error("Buffer pool exhausted ({capacity} buffers outstanding)")]
    AllocationFailure { capacity: usize },

    /// The request carries an instruction kind this compositor does not handle.
    #[error("Unexpected instruction type: {found}")]
    InstructionTypeMismatch { found: &'static str },

    /// The image backend could not render into the output buffer.
    #[error("Render backend failure: {0}")]
    RenderBackendFailure(#[from] BackendError),

    /// No render context has been supplied yet.
    #[error("No render context available")]
    NoRenderContext,

    /// The render context has a zero or oversized extent.
    #[error("Invalid render context extent {width}x{height}")]
    InvalidRenderContext { width: u32, height: u32 },

    /// The request has no instruction at all.
    #[error("Request has no composition instruction")]
    MissingInstruction,

    /// Instruction code panicked while the request was rendering.
    #[error("Render panicked: {0}")]
    Panicked(String),

    /// The render lane has shut down and no longer accepts requests.
    #[error("Render lane is not running")]
    LaneStopped,
}

impl RenderError {
    /// Whether the host may reasonably resubmit the same request later.
    ///
    /// Only pool pressure is transient; everything else fails again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::AllocationFailure { .. })
    }
}

/// Errors raised by an [`ImageBackend`](crate::backend::ImageBackend).
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Render target is empty")]
    EmptyTarget,

    #[error("Render target does not match its {format:?} layout")]
    MalformedTarget { format: PixelFormat },

    #[error("{0}")]
    Other(String),
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors raised while constructing a compositor.
#[derive(Debug, Error)]
pub enum CompositorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to spawn render lane: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Result type alias for render operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;
