//! Compositor configuration.
//!
//! Loaded from JSON by hosts that keep settings on disk; every field has a
//! default so partial documents are accepted.

use crate::error::ConfigError;
use cabbage_core::limits::MAX_FRAME_DIMENSION;
use cabbage_core::PixelFormat;
use serde::{Deserialize, Serialize};

/// Configuration for a [`VideoCompositor`](crate::VideoCompositor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositorConfig {
    /// Name of the render lane thread.
    pub lane_name: String,
    /// Pixel format the compositor wants for source frames.
    pub source_pixel_format: PixelFormat,
    /// Pixel format the compositor requires for output buffers.
    pub output_pixel_format: PixelFormat,
    /// Whether buffers must be shareable with the GPU.
    pub gpu_compatible: bool,
    /// Largest accepted render context width or height.
    pub max_dimension: u32,
    /// Render output rows in parallel inside a single frame render.
    pub parallel_rows: bool,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            lane_name: "cabbage-render-lane".to_string(),
            source_pixel_format: PixelFormat::Nv12,
            output_pixel_format: PixelFormat::Bgra8,
            gpu_compatible: true,
            max_dimension: MAX_FRAME_DIMENSION,
            parallel_rows: true,
        }
    }
}

impl CompositorConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check field invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lane_name.trim().is_empty() {
            return Err(ConfigError::Invalid("lane_name must not be empty".into()));
        }
        if self.max_dimension == 0 {
            return Err(ConfigError::Invalid("max_dimension must be positive".into()));
        }
        if !self.output_pixel_format.is_packed() {
            return Err(ConfigError::Invalid(format!(
                "output format {:?} must be a packed format",
                self.output_pixel_format
            )));
        }
        Ok(())
    }
}
