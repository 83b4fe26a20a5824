//! Integration tests for composed frame contents.

use crate::support::{compositor, solid};
use cabbage_compositor::{
    FrameRequest, Image, ImageOverlayInstruction, Instruction, LayerInstruction, RenderContext,
    TrackCompositionInstruction, TrackId, VideoCompositor, VideoCompositorPort,
};
use cabbage_core::{Color, FrameBuffer, PixelFormat, RationalTime, Rect, TimeRange, Transform2D};

fn render(compositor: &VideoCompositor, request: FrameRequest) -> FrameBuffer {
    compositor
        .submit(request)
        .wait()
        .into_buffer()
        .expect("request completed")
        .detach()
}

fn with_context(width: u32, height: u32, format: PixelFormat) -> VideoCompositor {
    let compositor = compositor();
    compositor.render_context_changed(RenderContext::new(width, height, format, 4));
    compositor
}

#[test]
fn background_only_fills_every_pixel() {
    let compositor = with_context(7, 5, PixelFormat::Bgra8);
    let color = Color::from_rgba8(12, 34, 56, 255);
    let frame = render(&compositor, solid(color));
    for y in 0..5 {
        for x in 0..7 {
            assert_eq!(frame.pixel_rgba8(x, y), Some([12, 34, 56, 255]));
        }
    }
}

#[test]
fn opaque_full_frame_foreground_replaces_background() {
    let compositor = with_context(6, 4, PixelFormat::Bgra8);
    let foreground = Image::from_frame(&FrameBuffer::filled(6, 4, Color::MAGENTA));
    let request = FrameRequest::new(RationalTime::ZERO).with_instruction(Instruction::composition(
        ImageOverlayInstruction::new(Color::GREEN, foreground),
    ));
    let frame = render(&compositor, request);
    for y in 0..4 {
        for x in 0..6 {
            assert_eq!(frame.pixel_rgba8(x, y), Some([255, 0, 255, 255]));
        }
    }
}

#[test]
fn half_opacity_blends_with_background() {
    let compositor = with_context(2, 2, PixelFormat::Rgba8);
    let foreground = Image::solid(Color::WHITE).cropped(Rect::from_size(2, 2));
    let request = FrameRequest::new(RationalTime::ZERO).with_instruction(Instruction::composition(
        ImageOverlayInstruction::new(Color::BLACK, foreground).with_opacity(0.5),
    ));
    let frame = render(&compositor, request);
    let [r, g, b, a] = frame.pixel_rgba8(0, 0).expect("pixel");
    assert!((127..=128).contains(&r));
    assert_eq!((r, g, b, a), (r, r, r, 255));
}

#[test]
fn transformed_overlay_lands_where_expected() {
    let compositor = with_context(8, 8, PixelFormat::Bgra8);
    let badge = Image::solid(Color::RED).cropped(Rect::from_size(2, 2));
    let request = FrameRequest::new(RationalTime::ZERO).with_instruction(Instruction::composition(
        ImageOverlayInstruction::new(Color::BLACK, badge)
            .then_transform(Transform2D::scale_uniform(2.0))
            .then_transform(Transform2D::translate(4.0, 4.0)),
    ));
    let frame = render(&compositor, request);
    assert_eq!(frame.pixel_rgba8(3, 3), Some([0, 0, 0, 255]));
    assert_eq!(frame.pixel_rgba8(4, 4), Some([255, 0, 0, 255]));
    assert_eq!(frame.pixel_rgba8(7, 7), Some([255, 0, 0, 255]));
}

#[test]
fn track_layers_follow_time_ranges() {
    let compositor = with_context(4, 4, PixelFormat::Bgra8);
    let instruction = TrackCompositionInstruction::new(Color::BLACK)
        .with_layer(LayerInstruction::new(TrackId(1)))
        .with_layer(
            LayerInstruction::new(TrackId(2))
                .then_transform(Transform2D::translate(2.0, 2.0))
                .during(TimeRange::from_start_end(RationalTime::new(1, 1), RationalTime::new(2, 1))),
        );
    let instruction = Instruction::composition(instruction);
    let request_at = |seconds: i64| {
        FrameRequest::new(RationalTime::new(seconds, 1))
            .with_instruction(instruction.clone())
            .with_source(TrackId(1), FrameBuffer::filled(4, 4, Color::BLUE))
            .with_source(TrackId(2), FrameBuffer::filled(2, 2, Color::YELLOW))
    };

    let before = render(&compositor, request_at(0));
    assert_eq!(before.pixel_rgba8(3, 3), Some([0, 0, 255, 255]));

    let during = render(&compositor, request_at(1));
    assert_eq!(during.pixel_rgba8(0, 0), Some([0, 0, 255, 255]));
    assert_eq!(during.pixel_rgba8(3, 3), Some([255, 255, 0, 255]));
}

#[test]
fn missing_source_track_leaves_background() {
    let compositor = with_context(2, 2, PixelFormat::Bgra8);
    let instruction = TrackCompositionInstruction::new(Color::CYAN).with_layer(LayerInstruction::new(TrackId(5)));
    let request = FrameRequest::new(RationalTime::ZERO).with_instruction(Instruction::composition(instruction));
    let frame = render(&compositor, request);
    assert_eq!(frame.pixel_rgba8(1, 1), Some([0, 255, 255, 255]));
}

#[test]
fn nv12_sources_are_decoded_for_layers() {
    let compositor = with_context(4, 4, PixelFormat::Bgra8);
    let mut source = FrameBuffer::new(4, 4, PixelFormat::Nv12);
    // Mid gray: Y = 128, neutral chroma.
    source.planes[0].data.fill(128);
    source.planes[1].data.fill(128);
    let instruction = TrackCompositionInstruction::new(Color::BLACK).with_layer(LayerInstruction::new(TrackId(1)));
    let request = FrameRequest::new(RationalTime::ZERO)
        .with_instruction(Instruction::composition(instruction))
        .with_source(TrackId(1), source);
    let frame = render(&compositor, request);
    let [r, g, b, a] = frame.pixel_rgba8(2, 2).expect("pixel");
    for channel in [r, g, b] {
        assert!((126..=130).contains(&channel), "channel {channel}");
    }
    assert_eq!(a, 255);
}
