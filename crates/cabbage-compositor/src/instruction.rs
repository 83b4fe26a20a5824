//! Composition instructions: what to draw for a request.
//!
//! Instructions are polymorphic behind [`CompositionInstruction`]. The
//! request side carries an [`Instruction`] tag so that instruction kinds the
//! compositor does not handle are rejected by matching, not by downcasting.

use crate::image::Image;
use crate::request::{FrameRequest, TrackId};
use cabbage_core::{Color, RationalTime, TimeRange, Transform2D};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Per-request description of a composed frame.
///
/// `apply` is a pure query: implementations must not mutate shared state.
pub trait CompositionInstruction: Send + Sync + fmt::Debug {
    /// Color painted under everything else.
    fn background_color(&self) -> Color;

    /// Foreground image for `request`, or `None` for background only.
    fn apply(&self, request: &FrameRequest) -> Option<Image>;

    /// Tracks whose source frames this instruction reads.
    fn required_source_tracks(&self) -> Vec<TrackId> {
        Vec::new()
    }

    /// Part of the timeline this instruction covers.
    fn time_range(&self) -> TimeRange {
        TimeRange::starting_at(RationalTime::ZERO)
    }
}

/// Instruction attached to a request by the host.
#[derive(Debug, Clone)]
pub enum Instruction {
    /// A compositing instruction this compositor renders.
    Composition(Arc<dyn CompositionInstruction>),
    /// The host's native pass-through of a single track. Not handled here.
    Passthrough { track: TrackId },
}

impl Instruction {
    /// Wrap a compositing instruction.
    pub fn composition(instruction: impl CompositionInstruction + 'static) -> Self {
        Self::Composition(Arc::new(instruction))
    }

    /// Short name of the variant, used in errors and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Composition(_) => "composition",
            Self::Passthrough { .. } => "passthrough",
        }
    }
}

/// Background fill only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolidColorInstruction {
    pub background: Color,
}

impl SolidColorInstruction {
    pub fn new(background: Color) -> Self {
        Self { background }
    }
}

impl CompositionInstruction for SolidColorInstruction {
    fn background_color(&self) -> Color {
        self.background
    }

    fn apply(&self, _request: &FrameRequest) -> Option<Image> {
        None
    }
}

/// A fixed foreground image over a background color.
#[derive(Debug, Clone)]
pub struct ImageOverlayInstruction {
    background: Color,
    foreground: Image,
    transform: Transform2D,
    opacity: f32,
}

impl ImageOverlayInstruction {
    pub fn new(background: Color, foreground: Image) -> Self {
        Self {
            background,
            foreground,
            transform: Transform2D::IDENTITY,
            opacity: 1.0,
        }
    }

    /// Append a transform to the chain applied to the foreground.
    pub fn then_transform(mut self, transform: Transform2D) -> Self {
        self.transform = self.transform.then(transform);
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }
}

impl CompositionInstruction for ImageOverlayInstruction {
    fn background_color(&self) -> Color {
        self.background
    }

    fn apply(&self, _request: &FrameRequest) -> Option<Image> {
        Some(
            self.foreground
                .transformed(self.transform)
                .with_opacity(self.opacity),
        )
    }
}

/// One source track placed into the frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerInstruction {
    pub track: TrackId,
    pub transform: Transform2D,
    pub opacity: f32,
    /// When the layer is visible; `None` means always.
    pub time_range: Option<TimeRange>,
}

impl LayerInstruction {
    pub fn new(track: TrackId) -> Self {
        Self {
            track,
            transform: Transform2D::IDENTITY,
            opacity: 1.0,
            time_range: None,
        }
    }

    pub fn then_transform(mut self, transform: Transform2D) -> Self {
        self.transform = self.transform.then(transform);
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn during(mut self, range: TimeRange) -> Self {
        self.time_range = Some(range);
        self
    }

    fn is_active(&self, request: &FrameRequest) -> bool {
        self.time_range
            .map_or(true, |range| range.contains(request.time()))
    }
}

/// Source-track layers stacked bottom to top over a background color.
///
/// Layers whose time range excludes the request time, or whose source frame
/// is missing from the request, are skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackCompositionInstruction {
    pub background: Color,
    pub layers: Vec<LayerInstruction>,
}

impl TrackCompositionInstruction {
    pub fn new(background: Color) -> Self {
        Self {
            background,
            layers: Vec::new(),
        }
    }

    /// Add a layer on top of the existing ones.
    pub fn with_layer(mut self, layer: LayerInstruction) -> Self {
        self.layers.push(layer);
        self
    }
}

impl CompositionInstruction for TrackCompositionInstruction {
    fn background_color(&self) -> Color {
        self.background
    }

    fn apply(&self, request: &FrameRequest) -> Option<Image> {
        self.layers
            .iter()
            .filter(|layer| layer.is_active(request))
            .filter_map(|layer| {
                let frame = request.source_frame(layer.track)?;
                Some(
                    Image::from_frame(frame)
                        .transformed(layer.transform)
                        .with_opacity(layer.opacity),
                )
            })
            .fold(None, |below: Option<Image>, image| {
                Some(match below {
                    Some(below) => image.composited_over(&below),
                    None => image,
                })
            })
    }

    fn required_source_tracks(&self) -> Vec<TrackId> {
        let mut tracks: Vec<TrackId> = self.layers.iter().map(|l| l.track).collect();
        tracks.sort_unstable();
        tracks.dedup();
        tracks
    }
}
