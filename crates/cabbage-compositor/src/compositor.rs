//! The host-facing compositor.
//!
//! [`VideoCompositor`] is the object a playback or export pipeline talks to:
//! it receives render context updates, accepts composition requests and
//! cancels pending work. Rendering itself happens on the render lane owned by
//! its [`RequestScheduler`].

use crate::backend::{CpuBackend, ImageBackend};
use crate::config::CompositorConfig;
use crate::context::{ContextSlot, RenderContext};
use crate::error::CompositorError;
use crate::renderer::FrameRenderer;
use crate::request::{CompositionRequest, FrameRequest, RequestHandle};
use crate::scheduler::{LaneStats, RequestScheduler};
use cabbage_core::PixelFormat;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Buffer requirements advertised to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBufferAttributes {
    pub pixel_format: PixelFormat,
    /// Buffers must be shareable with the GPU.
    pub gpu_compatible: bool,
}

/// Operations a host pipeline invokes on a custom compositor.
///
/// All methods may be called from any thread.
pub trait VideoCompositorPort: Send + Sync {
    /// Attributes the host should use for decoded source frames.
    fn source_pixel_buffer_attributes(&self) -> PixelBufferAttributes;

    /// Attributes output buffers must have.
    fn required_pixel_buffer_attributes(&self) -> PixelBufferAttributes;

    /// Install a new render context. Requests started afterwards render
    /// with it.
    fn render_context_changed(&self, context: RenderContext);

    /// Queue a request; its outcome arrives asynchronously through its sink.
    fn start_request(&self, request: CompositionRequest);

    /// Cancel every request that has not started rendering.
    fn cancel_all_pending_requests(&self);
}

/// Compositor rendering requests serially on a dedicated lane.
pub struct VideoCompositor {
    config: CompositorConfig,
    slot: Arc<ContextSlot>,
    scheduler: RequestScheduler,
}

impl VideoCompositor {
    /// Create a compositor rendering on the CPU.
    pub fn new(config: CompositorConfig) -> Result<Self, CompositorError> {
        let backend = CpuBackend::new().with_parallel_rows(config.parallel_rows);
        Self::with_backend(config, Box::new(backend))
    }

    /// Create a compositor rendering through `backend`.
    pub fn with_backend(
        config: CompositorConfig,
        backend: Box<dyn ImageBackend>,
    ) -> Result<Self, CompositorError> {
        config.validate()?;

        let slot = Arc::new(ContextSlot::new());
        let renderer = FrameRenderer::new(backend).with_max_dimension(config.max_dimension);
        let scheduler = RequestScheduler::spawn(&config.lane_name, Arc::clone(&slot), renderer)?;

        tracing::info!(
            lane = %config.lane_name,
            output = ?config.output_pixel_format,
            "Compositor created"
        );
        Ok(Self {
            config,
            slot,
            scheduler,
        })
    }

    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    /// Latest render context, if one was supplied.
    pub fn current_render_context(&self) -> Option<Arc<RenderContext>> {
        self.slot.snapshot()
    }

    /// Whether the render context changed since the flag was last cleared.
    pub fn render_context_did_change(&self) -> bool {
        self.slot.did_change()
    }

    /// Clear the context-change flag, returning its previous value.
    pub fn clear_render_context_did_change(&self) -> bool {
        self.slot.take_changed()
    }

    /// Start a request and return a handle to its outcome.
    pub fn submit(&self, frame: FrameRequest) -> RequestHandle {
        let (request, handle) = CompositionRequest::channel(frame);
        self.start_request(request);
        handle
    }

    /// Block until every request started before this call is terminal.
    pub fn flush(&self) {
        self.scheduler.flush();
    }

    pub fn stats(&self) -> LaneStats {
        self.scheduler.stats()
    }
}

impl VideoCompositorPort for VideoCompositor {
    fn source_pixel_buffer_attributes(&self) -> PixelBufferAttributes {
        PixelBufferAttributes {
            pixel_format: self.config.source_pixel_format,
            gpu_compatible: self.config.gpu_compatible,
        }
    }

    fn required_pixel_buffer_attributes(&self) -> PixelBufferAttributes {
        PixelBufferAttributes {
            pixel_format: self.config.output_pixel_format,
            gpu_compatible: self.config.gpu_compatible,
        }
    }

    fn render_context_changed(&self, context: RenderContext) {
        let (width, height) = context.size();
        let format = context.pixel_format();
        if format != self.config.output_pixel_format {
            tracing::warn!(
                ?format,
                required = ?self.config.output_pixel_format,
                "Render context format differs from required output format"
            );
        }
        self.slot.replace(Arc::new(context));
        tracing::info!(width, height, ?format, "Render context changed");
    }

    fn start_request(&self, request: CompositionRequest) {
        tracing::debug!(request = %request.id(), time = %request.frame().time(), "Request started");
        self.scheduler.submit(request);
    }

    fn cancel_all_pending_requests(&self) {
        self.scheduler.cancel_all();
    }
}

impl std::fmt::Debug for VideoCompositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoCompositor")
            .field("lane", &self.config.lane_name)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}
