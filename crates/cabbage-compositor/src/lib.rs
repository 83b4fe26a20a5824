//! Cabbage Compositor - per-frame video compositing engine
//!
//! Receives render context updates and composition requests from a host
//! pipeline, renders each request on a single serial lane, and delivers
//! exactly one outcome per request:
//! - `VideoCompositor` is the host-facing entry point
//! - `RequestScheduler` runs the render lane with epoch cancellation
//! - `FrameRenderer` composes background and foreground images
//! - `CpuBackend` rasterizes image recipes into output buffers

pub mod backend;
pub mod buffer_pool;
pub mod compositor;
pub mod config;
pub mod context;
pub mod error;
pub mod image;
pub mod instruction;
pub mod renderer;
pub mod request;
pub mod scheduler;

pub use backend::{CpuBackend, ImageBackend};
pub use buffer_pool::{BufferPool, PixelBuffer, PoolStats};
pub use compositor::{PixelBufferAttributes, VideoCompositor, VideoCompositorPort};
pub use config::CompositorConfig;
pub use context::{ContextSlot, RenderContext};
pub use error::{BackendError, CompositorError, ConfigError, RenderError, RenderResult};
pub use image::Image;
pub use instruction::{
    CompositionInstruction, ImageOverlayInstruction, Instruction, LayerInstruction,
    SolidColorInstruction, TrackCompositionInstruction,
};
pub use renderer::FrameRenderer;
pub use request::{
    CompletionSink, CompositionRequest, FrameRequest, RequestHandle, RequestOutcome, RequestState,
    TrackId,
};
pub use scheduler::{LaneStats, RequestScheduler};
