//! Cabbage - compositor demo
//!
//! Drives a compositor the way a playback pipeline would: install a render
//! context, start a few requests, cancel the pending ones, and report what
//! each request ended as.
//!
//! Usage: `cabbage [config.json]`

use anyhow::{Context, Result};
use cabbage_compositor::{
    CompositorConfig, FrameRequest, ImageOverlayInstruction, Instruction, LayerInstruction,
    RenderContext, RequestHandle, RequestOutcome, SolidColorInstruction,
    TrackCompositionInstruction, TrackId, VideoCompositor, VideoCompositorPort,
};
use cabbage_core::limits::DEFAULT_POOL_CAPACITY;
use cabbage_core::{Color, FrameBuffer, FrameRate, RationalTime, Rect, Transform2D};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Cabbage compositor demo starting...");

    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            CompositorConfig::from_json(&json)?
        }
        None => CompositorConfig::default(),
    };

    let compositor = VideoCompositor::new(config)?;
    let output = compositor.required_pixel_buffer_attributes();
    compositor.render_context_changed(RenderContext::new(
        1920,
        1080,
        output.pixel_format,
        DEFAULT_POOL_CAPACITY,
    ));

    let rate = FrameRate::FPS_30;
    let r1 = compositor.submit(solid_frame(RationalTime::from_frames(0, rate), Color::RED));
    let r2 = compositor.submit(picture_in_picture(RationalTime::from_frames(1, rate))?);
    compositor.cancel_all_pending_requests();
    let r3 = compositor.submit(overlay_frame(RationalTime::from_frames(2, rate)));

    for (name, handle) in [("R1", r1), ("R2", r2), ("R3", r3)] {
        report(name, handle).await;
    }

    let stats = compositor.stats();
    info!(
        submitted = stats.submitted,
        completed = stats.completed,
        failed = stats.failed,
        cancelled = stats.cancelled,
        "Demo finished"
    );
    Ok(())
}

fn solid_frame(time: RationalTime, color: Color) -> FrameRequest {
    FrameRequest::new(time).with_instruction(Instruction::composition(SolidColorInstruction::new(color)))
}

/// Horizontal gray ramp, as a decoder would hand over raw RGBA bytes.
fn ramp(width: u32, height: u32) -> Result<FrameBuffer> {
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
    for _ in 0..height {
        for x in 0..width {
            let v = (x * 255 / width.max(1)) as u8;
            pixels.extend_from_slice(&[v, v, v, 255]);
        }
    }
    Ok(FrameBuffer::from_rgba8(width, height, &pixels)?)
}

fn picture_in_picture(time: RationalTime) -> Result<FrameRequest> {
    let instruction = TrackCompositionInstruction::new(Color::BLACK)
        .with_layer(LayerInstruction::new(TrackId(1)))
        .with_layer(
            LayerInstruction::new(TrackId(2))
                .then_transform(Transform2D::scale_uniform(0.25))
                .then_transform(Transform2D::translate(1400.0, 760.0)),
        );
    Ok(FrameRequest::new(time)
        .with_instruction(Instruction::composition(instruction))
        .with_source(TrackId(1), FrameBuffer::filled(1920, 1080, Color::BLUE))
        .with_source(TrackId(2), ramp(1920, 1080)?))
}

fn overlay_frame(time: RationalTime) -> FrameRequest {
    let badge = cabbage_compositor::Image::solid(Color::GREEN).cropped(Rect::from_size(320, 180));
    let instruction = ImageOverlayInstruction::new(Color::BLACK, badge)
        .then_transform(Transform2D::translate(800.0, 450.0))
        .with_opacity(0.75);
    FrameRequest::new(time).with_instruction(Instruction::composition(instruction))
}

async fn report(name: &str, handle: RequestHandle) {
    match handle.outcome().await {
        RequestOutcome::Completed(buffer) => info!(
            request = name,
            width = buffer.width,
            height = buffer.height,
            center = ?buffer.pixel_rgba8(buffer.width / 2, buffer.height / 2),
            "Completed"
        ),
        RequestOutcome::Failed(err) => info!(request = name, error = %err, "Failed"),
        RequestOutcome::Cancelled => info!(request = name, "Cancelled"),
    }
}
