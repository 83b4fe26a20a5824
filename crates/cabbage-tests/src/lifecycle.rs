//! Integration tests for request ordering, cancellation and delivery.

use crate::support::{compositor, gate, solid};
use cabbage_compositor::{
    BackendError, CompositionRequest, CompositorConfig, CpuBackend, FrameRequest, Image,
    ImageBackend, RenderContext, RenderError, RequestOutcome, RequestState, VideoCompositor,
    VideoCompositorPort,
};
use cabbage_core::{Color, FrameBuffer, PixelFormat, RationalTime};
use parking_lot::Mutex;
use std::sync::Arc;

/// Backend whose first render fails, as after a lost device.
struct FailFirstBackend {
    failed: bool,
    inner: CpuBackend,
}

impl ImageBackend for FailFirstBackend {
    fn render(&mut self, image: &Image, target: &mut FrameBuffer) -> Result<(), BackendError> {
        if !self.failed {
            self.failed = true;
            return Err(BackendError::Other("device lost".into()));
        }
        self.inner.render(image, target)
    }
}

fn context(width: u32, height: u32) -> RenderContext {
    RenderContext::new(width, height, PixelFormat::Bgra8, 16)
}

// ── Ordering ───────────────────────────────────────────────────

#[test]
fn requests_finish_in_submission_order() {
    let compositor = compositor();
    compositor.render_context_changed(context(8, 8));

    let order = Arc::new(Mutex::new(Vec::new()));
    for i in 0..10u32 {
        let order = Arc::clone(&order);
        // Every third request has no instruction and fails.
        let frame = if i % 3 == 0 {
            FrameRequest::new(RationalTime::ZERO)
        } else {
            solid(Color::RED)
        };
        compositor.start_request(CompositionRequest::with_callback(frame, move |outcome| {
            assert!(!outcome.is_cancelled());
            order.lock().push(i);
        }));
    }
    compositor.flush();

    assert_eq!(*order.lock(), (0..10).collect::<Vec<_>>());
    let stats = compositor.stats();
    assert_eq!(stats.submitted, 10);
    assert_eq!(stats.failed, 4);
    assert_eq!(stats.completed, 6);
    assert_eq!(stats.pending(), 0);
}

// ── Cancellation ───────────────────────────────────────────────

#[test]
fn cancel_then_submit_renders_normally() {
    let compositor = compositor();
    compositor.render_context_changed(context(4, 4));
    compositor.cancel_all_pending_requests();
    compositor.cancel_all_pending_requests();

    let outcome = compositor.submit(solid(Color::BLUE)).wait();
    let buffer = outcome.into_buffer().expect("completed");
    assert_eq!(buffer.pixel_rgba8(0, 0), Some([0, 0, 255, 255]));
}

#[test]
fn queued_requests_cancelled_without_allocation() {
    let compositor = compositor();
    compositor.render_context_changed(context(4, 4));
    let ctx = compositor.current_render_context().expect("context");

    let (blocker, control) = gate(Color::BLACK);
    let blocker = compositor.submit(blocker);
    control.wait_started();

    let queued: Vec<_> = (0..5).map(|_| compositor.submit(solid(Color::RED))).collect();
    compositor.cancel_all_pending_requests();
    control.open();

    assert!(blocker.wait().is_completed());
    for handle in queued {
        assert!(handle.wait().is_cancelled());
    }
    // Only the gated request ever touched the pool.
    assert_eq!(ctx.pool().stats().allocated, 1);
    assert_eq!(compositor.stats().cancelled, 5);
}

#[test]
fn running_render_is_not_preempted() {
    let compositor = compositor();
    compositor.render_context_changed(context(2, 2));

    let (blocker, control) = gate(Color::GREEN);
    let handle = compositor.submit(blocker);
    control.wait_started();
    compositor.cancel_all_pending_requests();
    control.open();

    let buffer = handle.wait().into_buffer().expect("completed");
    assert_eq!(buffer.pixel_rgba8(1, 1), Some([0, 255, 0, 255]));
}

#[test]
fn red_cancel_then_green_scenario() {
    let compositor = compositor();
    compositor.render_context_changed(context(1920, 1080));

    // R1 holds the lane so R2 is still queued when the cancel lands.
    let (r1, control) = gate(Color::RED);
    let r1 = compositor.submit(r1);
    control.wait_started();
    let r2 = compositor.submit(solid(Color::BLUE));
    compositor.cancel_all_pending_requests();
    let r3 = compositor.submit(solid(Color::GREEN));
    control.open();

    let red = r1.wait().into_buffer().expect("R1 completed");
    assert_eq!(red.pixel_rgba8(960, 540), Some([255, 0, 0, 255]));
    assert!(r2.wait().is_cancelled());
    let green = r3.wait().into_buffer().expect("R3 completed");
    assert_eq!(green.pixel_rgba8(0, 1079), Some([0, 255, 0, 255]));
}

// ── Delivery ───────────────────────────────────────────────────

#[test]
fn pool_exhaustion_fails_request_and_is_retryable() {
    let compositor = compositor();
    compositor.render_context_changed(RenderContext::new(2, 2, PixelFormat::Bgra8, 1));

    let held = compositor.submit(solid(Color::RED)).wait().into_buffer().expect("first");
    let outcome = compositor.submit(solid(Color::RED)).wait();
    let err = outcome.error().expect("second fails");
    assert!(matches!(err, RenderError::AllocationFailure { capacity: 1 }));
    assert!(err.is_retryable());

    drop(held);
    assert!(compositor.submit(solid(Color::RED)).wait().is_completed());
}

#[test]
fn backend_failure_ends_only_its_request() {
    let backend = FailFirstBackend {
        failed: false,
        inner: CpuBackend::new(),
    };
    let compositor = VideoCompositor::with_backend(CompositorConfig::default(), Box::new(backend))
        .expect("compositor");
    compositor.render_context_changed(RenderContext::new(4, 4, PixelFormat::Bgra8, 3));
    let ctx = compositor.current_render_context().expect("context");

    let (blocker, control) = gate(Color::BLACK);
    let first = compositor.submit(blocker);
    control.wait_started();
    let second = compositor.submit(solid(Color::RED));
    let third = compositor.submit(solid(Color::BLUE));
    control.open();

    let first = first.wait();
    assert_eq!(first.state(), RequestState::Failed);
    assert!(matches!(
        first.error(),
        Some(RenderError::RenderBackendFailure(BackendError::Other(msg))) if msg == "device lost"
    ));
    let red = second.wait().into_buffer().expect("second completed");
    assert_eq!(red.pixel_rgba8(3, 3), Some([255, 0, 0, 255]));
    let blue = third.wait().into_buffer().expect("third completed");
    assert_eq!(blue.pixel_rgba8(0, 0), Some([0, 0, 255, 255]));

    drop((red, blue));
    assert_eq!(ctx.pool().stats().outstanding, 0);
    let stats = compositor.stats();
    assert_eq!((stats.failed, stats.completed, stats.pending()), (1, 2, 0));
}

#[test]
fn panicking_callback_leaves_compositor_usable() {
    let compositor = compositor();
    compositor.render_context_changed(context(2, 2));
    compositor.start_request(CompositionRequest::with_callback(solid(Color::RED), |_| {
        panic!("host callback failed");
    }));
    compositor.flush();

    let outcome = compositor.submit(solid(Color::GREEN)).wait();
    assert_eq!(outcome.state(), RequestState::Completed);
}

#[test]
fn dropping_compositor_drains_queue() {
    let compositor = compositor();
    compositor.render_context_changed(context(2, 2));
    let handles: Vec<_> = (0..3).map(|_| compositor.submit(solid(Color::RED))).collect();
    drop(compositor);
    for handle in handles {
        assert!(handle.wait().is_completed());
    }
}

#[tokio::test]
async fn outcome_can_be_awaited() {
    let compositor = compositor();
    compositor.render_context_changed(context(2, 2));
    match compositor.submit(solid(Color::WHITE)).outcome().await {
        RequestOutcome::Completed(buffer) => {
            assert_eq!(buffer.pixel_rgba8(0, 0), Some([255, 255, 255, 255]));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}
