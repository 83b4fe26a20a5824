//! Composition requests and their completion plumbing.
//!
//! A [`CompositionRequest`] pairs the description of one output frame with a
//! [`CompletionSink`] that receives exactly one [`RequestOutcome`]. The sink
//! is consumed when an outcome is delivered, and a sink dropped without
//! delivery reports `Cancelled`, so no request can end without an outcome.

use crate::buffer_pool::PixelBuffer;
use crate::error::RenderError;
use crate::instruction::Instruction;
use cabbage_core::{FrameBuffer, RationalTime, SharedFrameBuffer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Identifier of a source track supplying frames to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(pub u32);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "track-{}", self.0)
    }
}

/// What to render for one output frame.
#[derive(Debug, Clone)]
pub struct FrameRequest {
    id: Uuid,
    time: RationalTime,
    instruction: Option<Instruction>,
    sources: HashMap<TrackId, SharedFrameBuffer>,
}

impl FrameRequest {
    /// A request for the frame at `time` with no instruction yet.
    pub fn new(time: RationalTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            time,
            instruction: None,
            sources: HashMap::new(),
        }
    }

    /// Attach the instruction describing this frame.
    pub fn with_instruction(mut self, instruction: Instruction) -> Self {
        self.instruction = Some(instruction);
        self
    }

    /// Attach a decoded source frame for `track`.
    pub fn with_source(mut self, track: TrackId, frame: impl Into<SharedFrameBuffer>) -> Self {
        self.sources.insert(track, frame.into());
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Composition time of the requested frame.
    pub fn time(&self) -> RationalTime {
        self.time
    }

    pub fn instruction(&self) -> Option<&Instruction> {
        self.instruction.as_ref()
    }

    /// Source frame for `track`, if the host supplied one.
    pub fn source_frame(&self, track: TrackId) -> Option<&FrameBuffer> {
        self.sources.get(&track).map(Arc::as_ref)
    }

    /// Tracks with a supplied source frame, in ascending order.
    pub fn source_tracks(&self) -> Vec<TrackId> {
        let mut tracks: Vec<TrackId> = self.sources.keys().copied().collect();
        tracks.sort_unstable();
        tracks
    }
}

/// Terminal state of a request.
#[derive(Debug)]
pub enum RequestOutcome {
    /// The composed frame.
    Completed(PixelBuffer),
    /// Rendering failed; the request is not retried.
    Failed(RenderError),
    /// The request was cancelled before it started rendering.
    Cancelled,
}

impl RequestOutcome {
    pub fn state(&self) -> RequestState {
        match self {
            Self::Completed(_) => RequestState::Completed,
            Self::Failed(_) => RequestState::Failed,
            Self::Cancelled => RequestState::Cancelled,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// The composed buffer, if the request completed.
    pub fn into_buffer(self) -> Option<PixelBuffer> {
        match self {
            Self::Completed(buffer) => Some(buffer),
            _ => None,
        }
    }

    /// The failure, if the request failed.
    pub fn error(&self) -> Option<&RenderError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Lifecycle of a request:
/// `Submitted -> {Cancelled | Failed | Rendering -> {Completed | Failed}}`.
///
/// A request fails without rendering only when the lane has stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestState {
    Submitted,
    Rendering,
    Cancelled,
    Completed,
    Failed,
}

impl RequestState {
    /// Terminal states have no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed | Self::Failed)
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Submitted, Self::Cancelled)
                | (Self::Submitted, Self::Failed)
                | (Self::Submitted, Self::Rendering)
                | (Self::Rendering, Self::Completed)
                | (Self::Rendering, Self::Failed)
        )
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Submitted,
            1 => Self::Rendering,
            2 => Self::Cancelled,
            3 => Self::Completed,
            _ => Self::Failed,
        }
    }
}

/// Current state of one request, shared by its sink and handle.
#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    fn new() -> Arc<Self> {
        Arc::new(Self(AtomicU8::new(RequestState::Submitted as u8)))
    }

    fn get(&self) -> RequestState {
        RequestState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move to `next` if the transition is legal. Returns whether it moved.
    fn advance(&self, next: RequestState) -> bool {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                RequestState::from_u8(current)
                    .can_transition_to(next)
                    .then_some(next as u8)
            })
            .is_ok()
    }
}

type Callback = Box<dyn FnOnce(RequestOutcome) + Send + 'static>;

enum SinkTarget {
    Channel(oneshot::Sender<RequestOutcome>),
    Callback(Callback),
}

/// Receiver of a request's single outcome.
pub struct CompletionSink {
    target: Option<SinkTarget>,
    state: Arc<StateCell>,
}

impl CompletionSink {
    /// A sink that invokes `callback` with the outcome on the render lane.
    pub fn callback(callback: impl FnOnce(RequestOutcome) + Send + 'static) -> Self {
        Self {
            target: Some(SinkTarget::Callback(Box::new(callback))),
            state: StateCell::new(),
        }
    }

    /// Current state of the request this sink belongs to.
    pub fn state(&self) -> RequestState {
        self.state.get()
    }

    /// Record that the lane has started rendering the request.
    pub fn mark_rendering(&self) {
        if !self.state.advance(RequestState::Rendering) {
            tracing::warn!(state = ?self.state.get(), "Request cannot start rendering");
        }
    }

    /// Deliver the outcome. Consumes the sink, so it happens at most once.
    pub fn finish(mut self, outcome: RequestOutcome) {
        self.deliver(outcome);
    }

    fn deliver(&mut self, outcome: RequestOutcome) {
        if self.target.is_none() {
            return;
        }
        let next = outcome.state();
        if !self.state.advance(next) {
            tracing::warn!(from = ?self.state.get(), to = ?next, "Illegal request state transition");
        }
        match self.target.take() {
            // The receiver may have been dropped; the outcome (and any
            // buffer inside it) is released here.
            Some(SinkTarget::Channel(tx)) => drop(tx.send(outcome)),
            Some(SinkTarget::Callback(callback)) => callback(outcome),
            None => {}
        }
    }
}

impl Drop for CompletionSink {
    fn drop(&mut self) {
        if self.target.is_some() {
            self.deliver(RequestOutcome::Cancelled);
        }
    }
}

impl fmt::Debug for CompletionSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.target {
            Some(SinkTarget::Channel(_)) => "channel",
            Some(SinkTarget::Callback(_)) => "callback",
            None => "finished",
        };
        f.debug_tuple("CompletionSink").field(&kind).finish()
    }
}

/// Host-side view of a submitted request.
#[derive(Debug)]
pub struct RequestHandle {
    id: Uuid,
    rx: oneshot::Receiver<RequestOutcome>,
    state: Arc<StateCell>,
}

impl RequestHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Where the request is in its lifecycle right now.
    ///
    /// A terminal state is published before the outcome is sent.
    pub fn state(&self) -> RequestState {
        self.state.get()
    }

    /// Block the current thread until the outcome arrives.
    ///
    /// Must not be called from inside an async runtime; use
    /// [`outcome`](Self::outcome) there.
    pub fn wait(self) -> RequestOutcome {
        self.rx.blocking_recv().unwrap_or(RequestOutcome::Cancelled)
    }

    /// Await the outcome.
    pub async fn outcome(self) -> RequestOutcome {
        self.rx.await.unwrap_or(RequestOutcome::Cancelled)
    }

    /// Non-blocking poll; `None` while the request is still pending.
    pub fn try_outcome(&mut self) -> Option<RequestOutcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(RequestOutcome::Cancelled),
        }
    }
}

/// A frame request together with the sink that must receive its outcome.
#[derive(Debug)]
pub struct CompositionRequest {
    frame: FrameRequest,
    sink: CompletionSink,
}

impl CompositionRequest {
    /// Create a request whose outcome is read through the returned handle.
    pub fn channel(frame: FrameRequest) -> (Self, RequestHandle) {
        let (tx, rx) = oneshot::channel();
        let state = StateCell::new();
        let handle = RequestHandle {
            id: frame.id,
            rx,
            state: Arc::clone(&state),
        };
        let request = Self {
            frame,
            sink: CompletionSink {
                target: Some(SinkTarget::Channel(tx)),
                state,
            },
        };
        (request, handle)
    }

    /// Create a request whose outcome is passed to `callback`.
    pub fn with_callback(
        frame: FrameRequest,
        callback: impl FnOnce(RequestOutcome) + Send + 'static,
    ) -> Self {
        Self {
            frame,
            sink: CompletionSink::callback(callback),
        }
    }

    pub fn frame(&self) -> &FrameRequest {
        &self.frame
    }

    pub fn id(&self) -> Uuid {
        self.frame.id
    }

    pub fn state(&self) -> RequestState {
        self.sink.state()
    }

    /// Split into the frame description and the sink.
    pub fn into_parts(self) -> (FrameRequest, CompletionSink) {
        (self.frame, self.sink)
    }
}
