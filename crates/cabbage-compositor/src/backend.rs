//! Image backends: turn an [`Image`] recipe into pixels in a frame.
//!
//! The backend is stateful and not safe for concurrent use; the scheduler
//! owns exactly one and only calls it from the render lane.

use crate::error::BackendError;
use crate::image::Image;
use cabbage_core::{Color, FrameBuffer, FramePlane, PixelFormat};
use rayon::prelude::*;

/// Renders images into frames.
pub trait ImageBackend: Send {
    /// Render `image` over the full extent of `target`, overwriting every pixel.
    fn render(&mut self, image: &Image, target: &mut FrameBuffer) -> Result<(), BackendError>;
}

/// CPU backend evaluating the image per pixel.
#[derive(Debug, Clone)]
pub struct CpuBackend {
    parallel: bool,
}

impl CpuBackend {
    pub fn new() -> Self {
        Self { parallel: true }
    }

    /// Toggle row-parallel rendering within a frame.
    pub fn with_parallel_rows(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    fn for_each_row(&self, plane: &mut FramePlane, f: impl Fn(u32, &mut [u8]) + Sync) {
        let row_bytes = plane.width as usize * plane.bytes_per_pixel;
        let stride = plane.stride.max(1);
        let rows = plane.height as usize;
        let data = &mut plane.data[..stride * rows];
        if self.parallel {
            data.par_chunks_mut(stride)
                .enumerate()
                .for_each(|(y, row)| f(y as u32, &mut row[..row_bytes]));
        } else {
            data.chunks_mut(stride)
                .enumerate()
                .for_each(|(y, row)| f(y as u32, &mut row[..row_bytes]));
        }
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for CpuBackend {
    fn render(&mut self, image: &Image, target: &mut FrameBuffer) -> Result<(), BackendError> {
        if target.width == 0 || target.height == 0 {
            return Err(BackendError::EmptyTarget);
        }
        check_layout(target)?;

        let format = target.format;
        match format {
            PixelFormat::Nv12 => {
                let (luma, chroma) = target.planes.split_at_mut(1);
                self.for_each_row(&mut luma[0], |y, row| {
                    for (x, px) in row.iter_mut().enumerate() {
                        *px = encode_luma(shade(image, x as u32, y));
                    }
                });
                let (width, height) = (luma[0].width, luma[0].height);
                self.for_each_row(&mut chroma[0], |cy, row| {
                    for (cx, px) in row.chunks_exact_mut(2).enumerate() {
                        let (cb, cr) = encode_chroma(block_average(image, cx as u32, cy, width, height));
                        px[0] = cb;
                        px[1] = cr;
                    }
                });
            }
            packed => {
                self.for_each_row(target.primary_plane_mut(), |y, row| {
                    let bpp = packed.bytes_per_pixel();
                    for (x, px) in row.chunks_exact_mut(bpp).enumerate() {
                        encode_packed(packed, shade(image, x as u32, y), px);
                    }
                });
            }
        }

        Ok(())
    }
}

fn check_layout(target: &FrameBuffer) -> Result<(), BackendError> {
    let format = target.format;
    if target.planes.len() != format.plane_count() {
        return Err(BackendError::MalformedTarget { format });
    }
    let malformed = target.planes.iter().any(|plane| {
        plane.stride < plane.width as usize * plane.bytes_per_pixel
            || plane.data.len() < plane.stride * plane.height as usize
    });
    if malformed {
        return Err(BackendError::MalformedTarget { format });
    }
    Ok(())
}

/// Straight-alpha color of output pixel `(x, y)`.
#[inline]
fn shade(image: &Image, x: u32, y: u32) -> Color {
    image.pixel(x, y).unpremultiply()
}

fn block_average(image: &Image, cx: u32, cy: u32, width: u32, height: u32) -> Color {
    let (x0, y0) = (cx * 2, cy * 2);
    let mut sum = Color::TRANSPARENT;
    let mut count = 0.0;
    for y in y0..(y0 + 2).min(height) {
        for x in x0..(x0 + 2).min(width) {
            let c = shade(image, x, y);
            sum = Color::new(sum.r + c.r, sum.g + c.g, sum.b + c.b, sum.a + c.a);
            count += 1.0;
        }
    }
    sum.scale(1.0 / count)
}

#[inline]
fn encode_packed(format: PixelFormat, color: Color, px: &mut [u8]) {
    match format {
        PixelFormat::Rgba8 => px.copy_from_slice(&color.to_rgba8()),
        PixelFormat::Bgra8 => {
            let [r, g, b, a] = color.to_rgba8();
            px.copy_from_slice(&[b, g, r, a]);
        }
        PixelFormat::Rgba32F => px.copy_from_slice(bytemuck::bytes_of(&color)),
        PixelFormat::Gray8 => px[0] = Color::new(color.luminance(), 0.0, 0.0, 0.0).to_rgba8()[0],
        // Planar formats are encoded per plane.
        PixelFormat::Nv12 => {}
    }
}

// Full-range BT.601, matching `FrameBuffer::read_color`.
#[inline]
fn encode_luma(c: Color) -> u8 {
    let y = 0.299 * c.r + 0.587 * c.g + 0.114 * c.b;
    Color::new(y, 0.0, 0.0, 0.0).to_rgba8()[0]
}

#[inline]
fn encode_chroma(c: Color) -> (u8, u8) {
    let cb = -0.168_736 * c.r - 0.331_264 * c.g + 0.5 * c.b + 0.5;
    let cr = 0.5 * c.r - 0.418_688 * c.g - 0.081_312 * c.b + 0.5;
    let [cb, cr, _, _] = Color::new(cb, cr, 0.0, 0.0).to_rgba8();
    (cb, cr)
}
