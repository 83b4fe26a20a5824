//! Frame buffer types for video frames in CPU memory.
//!
//! Output buffers handed out by a render context and source frames handed to
//! instructions both use `FrameBuffer`.

use crate::color::Color;
use crate::error::{CabbageError, Result};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::sync::Arc;

/// Pixel format enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit RGBA (32 bits per pixel)
    #[default]
    Rgba8,
    /// 8-bit BGRA (32 bits per pixel), the usual display/encoder layout
    Bgra8,
    /// 32-bit RGBA float (128 bits per pixel)
    Rgba32F,
    /// 8-bit grayscale
    Gray8,
    /// NV12 YUV 4:2:0 bi-planar, full range (camera/decoder native)
    Nv12,
}

impl PixelFormat {
    /// Bytes per pixel for packed formats, or 0 for planar.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgba8 | Self::Bgra8 => 4,
            Self::Rgba32F => 16,
            Self::Gray8 => 1,
            Self::Nv12 => 0, // Planar
        }
    }

    /// Whether all channels live interleaved in a single plane.
    pub fn is_packed(self) -> bool {
        self.plane_count() == 1
    }

    /// Number of planes for this format.
    pub fn plane_count(self) -> usize {
        match self {
            Self::Rgba8 | Self::Bgra8 | Self::Rgba32F | Self::Gray8 => 1,
            Self::Nv12 => 2,
        }
    }

    /// Calculate tightly packed bytes needed for a frame of this format.
    pub fn frame_size(self, width: u32, height: u32) -> usize {
        let (w, h) = (width as usize, height as usize);
        match self {
            Self::Nv12 => {
                // Y plane + UV interleaved (half resolution, rounded up)
                let uv_w = w.div_ceil(2);
                let uv_h = h.div_ceil(2);
                w * h + uv_w * uv_h * 2
            }
            packed => w * h * packed.bytes_per_pixel(),
        }
    }
}

/// A plane of pixel data with stride information.
#[derive(Debug, Clone)]
pub struct FramePlane {
    /// Raw pixel data
    pub data: Vec<u8>,
    /// Bytes per row (may include padding)
    pub stride: usize,
    /// Bytes per pixel (or per sample pair for interleaved chroma)
    pub bytes_per_pixel: usize,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl FramePlane {
    /// Create a new zeroed frame plane with the given dimensions.
    pub fn new(width: u32, height: u32, bytes_per_pixel: usize) -> Self {
        // Rows start on 64-byte boundaries.
        let min_stride = (width as usize) * bytes_per_pixel;
        let stride = (min_stride + 63) & !63;
        let data = vec![0u8; stride * height as usize];
        Self {
            data,
            stride,
            bytes_per_pixel,
            width,
            height,
        }
    }

    /// Get a row of pixel data, without stride padding.
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        let end = start + self.width as usize * self.bytes_per_pixel;
        &self.data[start..end]
    }

    /// Get a mutable row of pixel data, without stride padding.
    #[inline]
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.stride;
        let end = start + self.width as usize * self.bytes_per_pixel;
        &mut self.data[start..end]
    }
}

/// A video frame in CPU memory.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    /// Pixel format
    pub format: PixelFormat,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Pixel data planes (1-2 depending on format)
    pub planes: SmallVec<[FramePlane; 2]>,
}

impl FrameBuffer {
    /// Create a new zeroed frame buffer with the given dimensions and format.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let planes = match format {
            PixelFormat::Nv12 => {
                smallvec::smallvec![
                    FramePlane::new(width, height, 1),                             // Y
                    FramePlane::new(width.div_ceil(2), height.div_ceil(2), 2),     // UV interleaved
                ]
            }
            packed => smallvec::smallvec![FramePlane::new(width, height, packed.bytes_per_pixel())],
        };

        Self {
            format,
            width,
            height,
            planes,
        }
    }

    /// Build an RGBA8 frame from tightly packed pixel bytes.
    pub fn from_rgba8(width: u32, height: u32, pixels: &[u8]) -> Result<Self> {
        let expected = PixelFormat::Rgba8.frame_size(width, height);
        if pixels.len() != expected {
            return Err(CabbageError::InvalidParameter(format!(
                "expected {expected} bytes for {width}x{height} RGBA8, got {}",
                pixels.len()
            )));
        }

        let mut frame = Self::new(width, height, PixelFormat::Rgba8);
        let row_bytes = width as usize * 4;
        let plane = frame.primary_plane_mut();
        for (y, src) in pixels.chunks_exact(row_bytes.max(1)).enumerate() {
            plane.row_mut(y as u32).copy_from_slice(src);
        }
        Ok(frame)
    }

    /// Create a frame filled with a single straight-alpha color.
    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        let px = color.to_rgba8();
        let mut frame = Self::new(width, height, PixelFormat::Rgba8);
        let plane = frame.primary_plane_mut();
        for y in 0..height {
            for chunk in plane.row_mut(y).chunks_exact_mut(4) {
                chunk.copy_from_slice(&px);
            }
        }
        frame
    }

    /// Total memory usage of this frame in bytes.
    pub fn memory_size(&self) -> usize {
        self.planes.iter().map(|p| p.data.len()).sum()
    }

    /// Get the primary plane (plane 0).
    #[inline]
    pub fn primary_plane(&self) -> &FramePlane {
        &self.planes[0]
    }

    /// Get the primary plane mutably.
    #[inline]
    pub fn primary_plane_mut(&mut self) -> &mut FramePlane {
        &mut self.planes[0]
    }

    /// Read one pixel as a straight-alpha color.
    ///
    /// NV12 is decoded with full-range BT.601 coefficients.
    pub fn read_color(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let plane = self.primary_plane();
        let row = plane.row(y);
        let i = x as usize * plane.bytes_per_pixel;
        let color = match self.format {
            PixelFormat::Rgba8 => Color::from_rgba8(row[i], row[i + 1], row[i + 2], row[i + 3]),
            PixelFormat::Bgra8 => Color::from_rgba8(row[i + 2], row[i + 1], row[i], row[i + 3]),
            PixelFormat::Gray8 => {
                let v = row[i] as f32 / 255.0;
                Color::rgb(v, v, v)
            }
            PixelFormat::Rgba32F => {
                let c: [f32; 4] = bytemuck::pod_read_unaligned(&row[i..i + 16]);
                Color::new(c[0], c[1], c[2], c[3])
            }
            PixelFormat::Nv12 => {
                let luma = row[x as usize] as f32 / 255.0;
                let chroma = self.planes[1].row(y / 2);
                let ci = (x / 2) as usize * 2;
                let cb = chroma[ci] as f32 / 255.0 - 0.5;
                let cr = chroma[ci + 1] as f32 / 255.0 - 0.5;
                Color::rgb(
                    (luma + 1.402 * cr).clamp(0.0, 1.0),
                    (luma - 0.344_136 * cb - 0.714_136 * cr).clamp(0.0, 1.0),
                    (luma + 1.772 * cb).clamp(0.0, 1.0),
                )
            }
        };
        Some(color)
    }

    /// Read one pixel of an 8-bit packed frame as RGBA bytes.
    pub fn pixel_rgba8(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        match self.format {
            PixelFormat::Rgba8 | PixelFormat::Bgra8 | PixelFormat::Gray8 => {
                self.read_color(x, y).map(Color::to_rgba8)
            }
            PixelFormat::Rgba32F | PixelFormat::Nv12 => None,
        }
    }
}

/// Arc-wrapped frame buffer for shared ownership.
pub type SharedFrameBuffer = Arc<FrameBuffer>;
