//! Cabbage Core - Foundation types for frame compositing
//!
//! This crate provides the fundamental types shared by the compositor:
//! - Time representation (RationalTime, FrameRate, TimeRange)
//! - Straight and premultiplied RGBA colors
//! - Frame buffers and pixel formats
//! - Geometric primitives for extents and transforms

pub mod color;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod time;

pub use color::Color;
pub use error::{CabbageError, Result};
pub use frame::{FrameBuffer, FramePlane, PixelFormat, SharedFrameBuffer};
pub use geometry::{Rect, Transform2D, Vec2};
pub use time::{FrameRate, RationalTime, TimeRange};

/// Frame size limits.
pub mod limits {
    /// Largest width or height a render context may declare (8K DCI plus headroom).
    pub const MAX_FRAME_DIMENSION: u32 = 8192;

    /// Default number of outstanding output buffers per render context.
    pub const DEFAULT_POOL_CAPACITY: usize = 6;
}
