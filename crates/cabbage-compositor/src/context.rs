//! Render contexts and the shared "latest context" slot.

use crate::buffer_pool::{BufferPool, PixelBuffer};
use crate::error::RenderResult;
use cabbage_core::{PixelFormat, Rect};
use parking_lot::RwLock;
use std::sync::Arc;

/// Host-supplied description of the output frames plus their allocator.
///
/// Immutable once built; a change on the host side produces a new context.
#[derive(Debug, Clone)]
pub struct RenderContext {
    width: u32,
    height: u32,
    pixel_format: PixelFormat,
    render_scale: f32,
    pool: BufferPool,
}

impl RenderContext {
    /// Create a context whose pool leases at most `pool_capacity` buffers.
    pub fn new(width: u32, height: u32, pixel_format: PixelFormat, pool_capacity: usize) -> Self {
        Self {
            width,
            height,
            pixel_format,
            render_scale: 1.0,
            pool: BufferPool::new(width, height, pixel_format, pool_capacity),
        }
    }

    /// Set the render scale reported to instructions.
    pub fn with_render_scale(mut self, scale: f32) -> Self {
        self.render_scale = scale;
        self
    }

    /// Output frame size in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    pub fn render_scale(&self) -> f32 {
        self.render_scale
    }

    /// Pixel-space rectangle covered by output frames.
    pub fn extent(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }

    /// True when frames would have no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Lease a new output buffer from this context's pool.
    pub fn new_pixel_buffer(&self) -> RenderResult<PixelBuffer> {
        self.pool.acquire()
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }
}

struct SlotState {
    current: Option<Arc<RenderContext>>,
    changed: bool,
}

/// Holder for the latest render context.
///
/// Writers swap the whole `Arc` under the lock, so a reader always sees one
/// complete snapshot. Snapshots already handed out stay valid after a swap.
pub struct ContextSlot {
    state: RwLock<SlotState>,
}

impl ContextSlot {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(SlotState {
                current: None,
                changed: false,
            }),
        }
    }

    /// Install a new context and raise the change flag.
    /// Returns the context it replaced.
    pub fn replace(&self, context: Arc<RenderContext>) -> Option<Arc<RenderContext>> {
        let mut state = self.state.write();
        state.changed = true;
        state.current.replace(context)
    }

    /// The latest context, if any.
    pub fn snapshot(&self) -> Option<Arc<RenderContext>> {
        self.state.read().current.clone()
    }

    /// Whether a context was installed since the flag was last cleared.
    pub fn did_change(&self) -> bool {
        self.state.read().changed
    }

    /// Clear the change flag, returning its previous value.
    pub fn take_changed(&self) -> bool {
        std::mem::take(&mut self.state.write().changed)
    }
}

impl Default for ContextSlot {
    fn default() -> Self {
        Self::new()
    }
}
