//! Output buffer pool for efficient frame reuse.
//!
//! Avoids allocating a fresh frame per request by keeping released frames
//! on a free list. The pool caps the number of buffers that may be leased at
//! once; when the cap is reached allocation fails instead of blocking the
//! render lane.

use crate::error::{RenderError, RenderResult};
use cabbage_core::{FrameBuffer, PixelFormat};
use parking_lot::Mutex;
use std::fmt;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// Snapshot of pool counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Buffers currently leased out.
    pub outstanding: usize,
    /// Released frames waiting for reuse.
    pub free: usize,
    /// Frames allocated fresh over the pool's lifetime.
    pub allocated: u64,
    /// Leases served from the free list.
    pub reused: u64,
}

struct PoolState {
    free: Vec<FrameBuffer>,
    outstanding: usize,
    allocated: u64,
    reused: u64,
}

struct PoolShared {
    width: u32,
    height: u32,
    format: PixelFormat,
    capacity: usize,
    state: Mutex<PoolState>,
}

impl PoolShared {
    fn release(&self, frame: FrameBuffer) {
        let mut state = self.state.lock();
        state.outstanding = state.outstanding.saturating_sub(1);
        if state.free.len() < self.capacity {
            state.free.push(frame);
        }
    }

    fn forget(&self) {
        let mut state = self.state.lock();
        state.outstanding = state.outstanding.saturating_sub(1);
    }
}

/// Pool of reusable output frames of one size and format.
///
/// Cloning is cheap and yields a handle to the same pool.
#[derive(Clone)]
pub struct BufferPool {
    shared: Arc<PoolShared>,
}

impl BufferPool {
    /// Create a pool handing out at most `capacity` buffers at a time.
    pub fn new(width: u32, height: u32, format: PixelFormat, capacity: usize) -> Self {
        Self {
            shared: Arc::new(PoolShared {
                width,
                height,
                format,
                capacity,
                state: Mutex::new(PoolState {
                    free: Vec::new(),
                    outstanding: 0,
                    allocated: 0,
                    reused: 0,
                }),
            }),
        }
    }

    /// Lease a buffer, reusing a released frame when one is available.
    ///
    /// Reused frames keep their previous contents.
    pub fn acquire(&self) -> RenderResult<PixelBuffer> {
        let shared = &self.shared;
        let mut state = shared.state.lock();

        if state.outstanding >= shared.capacity {
            return Err(RenderError::AllocationFailure {
                capacity: shared.capacity,
            });
        }
        state.outstanding += 1;

        let frame = match state.free.pop() {
            Some(frame) => {
                state.reused += 1;
                frame
            }
            None => {
                state.allocated += 1;
                FrameBuffer::new(shared.width, shared.height, shared.format)
            }
        };

        Ok(PixelBuffer {
            frame,
            leased: true,
            pool: Arc::clone(shared),
        })
    }

    /// Maximum number of simultaneously leased buffers.
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Current counters.
    pub fn stats(&self) -> PoolStats {
        let state = self.shared.state.lock();
        PoolStats {
            outstanding: state.outstanding,
            free: state.free.len(),
            allocated: state.allocated,
            reused: state.reused,
        }
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("width", &self.shared.width)
            .field("height", &self.shared.height)
            .field("format", &self.shared.format)
            .field("capacity", &self.shared.capacity)
            .field("stats", &self.stats())
            .finish()
    }
}

/// A frame leased from a [`BufferPool`].
///
/// Dropping the buffer returns its storage to the pool, so a buffer dropped
/// on failure or cancellation is released immediately.
pub struct PixelBuffer {
    frame: FrameBuffer,
    leased: bool,
    pool: Arc<PoolShared>,
}

impl PixelBuffer {
    /// Take the frame out of the pool for good. The lease slot is freed but
    /// the storage is not reused.
    pub fn detach(mut self) -> FrameBuffer {
        self.leased = false;
        self.pool.forget();
        mem::replace(&mut self.frame, empty_frame())
    }
}

fn empty_frame() -> FrameBuffer {
    FrameBuffer::new(0, 0, PixelFormat::Rgba8)
}

impl Deref for PixelBuffer {
    type Target = FrameBuffer;

    fn deref(&self) -> &FrameBuffer {
        &self.frame
    }
}

impl DerefMut for PixelBuffer {
    fn deref_mut(&mut self) -> &mut FrameBuffer {
        &mut self.frame
    }
}

impl Drop for PixelBuffer {
    fn drop(&mut self) {
        if self.leased {
            let frame = mem::replace(&mut self.frame, empty_frame());
            self.pool.release(frame);
        }
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.frame.width)
            .field("height", &self.frame.height)
            .field("format", &self.frame.format)
            .finish()
    }
}
