//! Shared fixtures for the integration tests.

use cabbage_compositor::{
    CompositionInstruction, CompositorConfig, FrameRequest, Image, Instruction,
    SolidColorInstruction, VideoCompositor,
};
use cabbage_core::{Color, RationalTime};
use crossbeam_channel::{Receiver, Sender};

pub fn compositor() -> VideoCompositor {
    VideoCompositor::new(CompositorConfig::default()).expect("compositor")
}

pub fn solid(color: Color) -> FrameRequest {
    FrameRequest::new(RationalTime::ZERO)
        .with_instruction(Instruction::composition(SolidColorInstruction::new(color)))
}

/// Instruction that parks the render lane inside `apply` until released,
/// so tests can queue work behind a render in progress.
#[derive(Debug)]
pub struct Gate {
    background: Color,
    started: Sender<()>,
    release: Receiver<()>,
}

/// Test-side controls for a [`Gate`].
pub struct GateControl {
    started: Receiver<()>,
    release: Sender<()>,
}

impl GateControl {
    /// Wait until the lane is inside the gated render.
    pub fn wait_started(&self) {
        self.started.recv().expect("gate never reached");
    }

    pub fn open(&self) {
        self.release.send(()).expect("gate dropped");
    }
}

pub fn gate(background: Color) -> (FrameRequest, GateControl) {
    let (started_tx, started_rx) = crossbeam_channel::unbounded();
    let (release_tx, release_rx) = crossbeam_channel::unbounded();
    let instruction = Gate {
        background,
        started: started_tx,
        release: release_rx,
    };
    let request = FrameRequest::new(RationalTime::ZERO).with_instruction(Instruction::composition(instruction));
    (
        request,
        GateControl {
            started: started_rx,
            release: release_tx,
        },
    )
}

impl CompositionInstruction for Gate {
    fn background_color(&self) -> Color {
        self.background
    }

    fn apply(&self, _request: &FrameRequest) -> Option<Image> {
        let _ = self.started.send(());
        let _ = self.release.recv();
        None
    }
}
