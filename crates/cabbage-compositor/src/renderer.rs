//! Single-request frame rendering.
//!
//! [`FrameRenderer`] turns one [`FrameRequest`] into a filled output buffer:
//! validate the context and instruction, lease a buffer, build the image
//! recipe (background plus optional foreground) and hand it to the backend.

use crate::backend::{CpuBackend, ImageBackend};
use crate::buffer_pool::PixelBuffer;
use crate::context::RenderContext;
use crate::error::{RenderError, RenderResult};
use crate::image::Image;
use crate::instruction::Instruction;
use crate::request::FrameRequest;
use cabbage_core::limits::MAX_FRAME_DIMENSION;
use std::fmt;

/// Renders frames through an owned [`ImageBackend`].
pub struct FrameRenderer {
    backend: Box<dyn ImageBackend>,
    max_dimension: u32,
}

impl FrameRenderer {
    pub fn new(backend: Box<dyn ImageBackend>) -> Self {
        Self {
            backend,
            max_dimension: MAX_FRAME_DIMENSION,
        }
    }

    /// Reject contexts whose width or height exceeds `max_dimension`.
    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    /// Render `request` into a buffer leased from `context`.
    ///
    /// Context and instruction are validated before anything is allocated.
    /// On any error the leased buffer, if any, goes back to the pool.
    pub fn render(
        &mut self,
        context: Option<&RenderContext>,
        request: &FrameRequest,
    ) -> RenderResult<PixelBuffer> {
        let context = context.ok_or(RenderError::NoRenderContext)?;
        let (width, height) = context.size();
        if context.is_empty() || width > self.max_dimension || height > self.max_dimension {
            return Err(RenderError::InvalidRenderContext { width, height });
        }

        let instruction = match request.instruction() {
            Some(Instruction::Composition(instruction)) => instruction,
            Some(other) => {
                return Err(RenderError::InstructionTypeMismatch {
                    found: other.kind(),
                })
            }
            None => return Err(RenderError::MissingInstruction),
        };

        let mut buffer = context.new_pixel_buffer()?;

        let background = Image::solid(instruction.background_color()).cropped(context.extent());
        let image = match instruction.apply(request) {
            Some(foreground) => foreground.composited_over(&background),
            None => background,
        };

        self.backend.render(&image, &mut buffer)?;
        Ok(buffer)
    }
}

impl Default for FrameRenderer {
    fn default() -> Self {
        Self::new(Box::new(CpuBackend::new()))
    }
}

impl fmt::Debug for FrameRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameRenderer")
            .field("max_dimension", &self.max_dimension)
            .finish_non_exhaustive()
    }
}
