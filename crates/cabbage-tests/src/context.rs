//! Integration tests for render context updates.

use crate::support::{compositor, solid};
use cabbage_compositor::{RenderContext, VideoCompositorPort};
use cabbage_core::{Color, PixelFormat};
use std::sync::Arc;
use std::thread;

#[test]
fn buffer_follows_latest_context() {
    let compositor = compositor();
    compositor.render_context_changed(RenderContext::new(1280, 720, PixelFormat::Bgra8, 2));
    let first = compositor.submit(solid(Color::RED)).wait().into_buffer().expect("first");
    assert_eq!((first.width, first.height), (1280, 720));

    compositor.render_context_changed(RenderContext::new(640, 360, PixelFormat::Rgba8, 2));
    let second = compositor.submit(solid(Color::RED)).wait().into_buffer().expect("second");
    assert_eq!((second.width, second.height, second.format), (640, 360, PixelFormat::Rgba8));

    // The earlier buffer is unaffected by the switch.
    assert_eq!((first.width, first.height, first.format), (1280, 720, PixelFormat::Bgra8));
}

#[test]
fn context_change_on_other_thread_is_visible_to_later_requests() {
    let compositor = Arc::new(compositor());
    let host = Arc::clone(&compositor);
    thread::spawn(move || {
        host.render_context_changed(RenderContext::new(32, 16, PixelFormat::Bgra8, 2));
    })
    .join()
    .expect("host thread");

    let buffer = compositor.submit(solid(Color::RED)).wait().into_buffer().expect("completed");
    assert_eq!((buffer.width, buffer.height), (32, 16));
}

#[test]
fn zero_extent_context_fails_requests() {
    let compositor = compositor();
    compositor.render_context_changed(RenderContext::new(0, 0, PixelFormat::Bgra8, 2));
    let outcome = compositor.submit(solid(Color::RED)).wait();
    assert!(matches!(
        outcome.error(),
        Some(cabbage_compositor::RenderError::InvalidRenderContext { width: 0, height: 0 })
    ));
}

#[test]
fn did_change_flag_round_trip() {
    let compositor = compositor();
    assert!(!compositor.render_context_did_change());
    compositor.render_context_changed(RenderContext::new(4, 4, PixelFormat::Bgra8, 1));
    assert!(compositor.render_context_did_change());
    assert!(compositor.clear_render_context_did_change());
    assert!(!compositor.clear_render_context_did_change());
}

/// Writers install contexts whose width is always twice the height. A torn
/// read would break that relation for readers or rendered buffers.
#[test]
fn concurrent_context_changes_never_tear() {
    let compositor = Arc::new(compositor());
    compositor.render_context_changed(RenderContext::new(2, 1, PixelFormat::Bgra8, 64));

    let writers: Vec<_> = (0..4u32)
        .map(|w| {
            let compositor = Arc::clone(&compositor);
            thread::spawn(move || {
                for i in 1..=50u32 {
                    let height = w * 50 + i;
                    compositor.render_context_changed(RenderContext::new(
                        height * 2,
                        height,
                        PixelFormat::Bgra8,
                        64,
                    ));
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..2)
        .map(|_| {
            let compositor = Arc::clone(&compositor);
            thread::spawn(move || {
                for _ in 0..200 {
                    let ctx = compositor.current_render_context().expect("context");
                    assert_eq!(ctx.width(), ctx.height() * 2);
                    let stats = ctx.pool().stats();
                    assert!(stats.outstanding <= ctx.pool().capacity());
                }
            })
        })
        .collect();

    let handles: Vec<_> = (0..20).map(|_| compositor.submit(solid(Color::RED))).collect();

    for t in writers.into_iter().chain(readers) {
        t.join().expect("worker thread");
    }
    for handle in handles {
        let buffer = handle.wait().into_buffer().expect("completed");
        assert_eq!(buffer.width, buffer.height * 2);
    }
}
