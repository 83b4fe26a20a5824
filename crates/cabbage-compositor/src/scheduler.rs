//! The serial render lane.
//!
//! All renders run on one named worker thread fed by a crossbeam channel, so
//! requests execute strictly in submission order and never overlap.
//!
//! Cancellation uses an epoch counter. Each task records the epoch at
//! submission; `cancel_all` bumps the counter, and a task whose epoch is
//! stale when the lane reaches it finishes as `Cancelled` without touching
//! the renderer. Tasks submitted after `cancel_all` carry the new epoch and
//! render normally. A render already in progress is never interrupted.

use crate::context::ContextSlot;
use crate::error::{CompositorError, RenderError};
use crate::renderer::FrameRenderer;
use crate::request::{CompletionSink, CompositionRequest, FrameRequest, RequestOutcome};
use crossbeam_channel::{Receiver, Sender};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Snapshot of lane counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LaneStats {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
}

impl LaneStats {
    /// Requests that have not reached a terminal state yet.
    pub fn pending(&self) -> u64 {
        self.submitted
            .saturating_sub(self.completed + self.failed + self.cancelled)
    }
}

#[derive(Default)]
struct LaneCounters {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
}

impl LaneCounters {
    fn snapshot(&self) -> LaneStats {
        LaneStats {
            submitted: self.submitted.load(Ordering::Acquire),
            completed: self.completed.load(Ordering::Acquire),
            failed: self.failed.load(Ordering::Acquire),
            cancelled: self.cancelled.load(Ordering::Acquire),
        }
    }

    fn record(&self, outcome: &RequestOutcome) {
        let counter = match outcome {
            RequestOutcome::Completed(_) => &self.completed,
            RequestOutcome::Failed(_) => &self.failed,
            RequestOutcome::Cancelled => &self.cancelled,
        };
        counter.fetch_add(1, Ordering::AcqRel);
    }
}

struct Task {
    request: CompositionRequest,
    epoch: u64,
}

enum LaneMessage {
    Render(Task),
    /// Barrier: acknowledged once everything queued before it is done.
    Flush(Sender<()>),
}

/// Everything the worker thread owns.
struct Lane {
    rx: Receiver<LaneMessage>,
    slot: Arc<ContextSlot>,
    renderer: FrameRenderer,
    epoch: Arc<AtomicU64>,
    counters: Arc<LaneCounters>,
}

impl Lane {
    fn run(mut self) {
        tracing::info!("Render lane started");
        while let Ok(message) = self.rx.recv() {
            match message {
                LaneMessage::Render(task) => self.process(task),
                LaneMessage::Flush(ack) => {
                    let _ = ack.send(());
                }
            }
        }
        tracing::info!("Render lane stopped");
    }

    fn process(&mut self, task: Task) {
        let (frame, sink) = task.request.into_parts();

        let current = self.epoch.load(Ordering::Acquire);
        if task.epoch != current {
            tracing::debug!(
                request = %frame.id(),
                epoch = task.epoch,
                current,
                "Request cancelled before start"
            );
            self.finish(sink, RequestOutcome::Cancelled);
            return;
        }

        sink.mark_rendering();
        let outcome = self.render(&frame);
        self.finish(sink, outcome);
    }

    fn render(&mut self, frame: &FrameRequest) -> RequestOutcome {
        let context = self.slot.snapshot();
        let renderer = &mut self.renderer;
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            renderer.render(context.as_deref(), frame)
        }))
        .unwrap_or_else(|payload| Err(RenderError::Panicked(panic_message(payload.as_ref()))));

        match result {
            Ok(buffer) => {
                tracing::debug!(
                    request = %frame.id(),
                    width = buffer.width,
                    height = buffer.height,
                    "Request completed"
                );
                RequestOutcome::Completed(buffer)
            }
            Err(err) => {
                tracing::warn!(request = %frame.id(), error = %err, "Request failed");
                RequestOutcome::Failed(err)
            }
        }
    }

    /// Count and deliver an outcome. A panicking host callback is logged
    /// and the lane keeps running.
    fn finish(&self, sink: CompletionSink, outcome: RequestOutcome) {
        self.counters.record(&outcome);
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| sink.finish(outcome))) {
            tracing::warn!(panic = %panic_message(payload.as_ref()), "Completion callback panicked");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Serial FIFO executor for composition requests.
///
/// Dropping the scheduler closes the queue, lets the lane drain what was
/// already submitted, and joins the worker thread.
pub struct RequestScheduler {
    lane_name: String,
    tx: Option<Sender<LaneMessage>>,
    epoch: Arc<AtomicU64>,
    counters: Arc<LaneCounters>,
    worker: Option<JoinHandle<()>>,
}

impl RequestScheduler {
    /// Spawn the render lane thread named `lane_name`.
    ///
    /// The lane reads the latest context from `slot` at the start of each
    /// render and owns `renderer` exclusively.
    pub fn spawn(
        lane_name: &str,
        slot: Arc<ContextSlot>,
        renderer: FrameRenderer,
    ) -> Result<Self, CompositorError> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let epoch = Arc::new(AtomicU64::new(0));
        let counters = Arc::new(LaneCounters::default());

        let lane = Lane {
            rx,
            slot,
            renderer,
            epoch: Arc::clone(&epoch),
            counters: Arc::clone(&counters),
        };
        let worker = thread::Builder::new()
            .name(lane_name.to_string())
            .spawn(move || lane.run())?;

        Ok(Self {
            lane_name: lane_name.to_string(),
            tx: Some(tx),
            epoch,
            counters,
            worker: Some(worker),
        })
    }

    /// Queue a request behind everything already submitted.
    ///
    /// Returns immediately; the outcome is delivered on the lane thread.
    /// If the lane has stopped, the request fails with
    /// [`RenderError::LaneStopped`], delivered on a short-lived helper thread.
    pub fn submit(&self, request: CompositionRequest) {
        self.counters.submitted.fetch_add(1, Ordering::AcqRel);
        let task = Task {
            request,
            epoch: self.epoch.load(Ordering::Acquire),
        };

        let Some(tx) = &self.tx else {
            self.reject(task.request);
            return;
        };
        if let Err(crossbeam_channel::SendError(LaneMessage::Render(task))) =
            tx.send(LaneMessage::Render(task))
        {
            self.reject(task.request);
        }
    }

    fn reject(&self, request: CompositionRequest) {
        tracing::error!(request = %request.id(), lane = %self.lane_name, "Render lane is not running");
        self.counters.failed.fetch_add(1, Ordering::AcqRel);

        let (_, sink) = request.into_parts();
        let delivery = thread::Builder::new()
            .name(format!("{}-reject", self.lane_name))
            .spawn(move || sink.finish(RequestOutcome::Failed(RenderError::LaneStopped)));
        if let Err(err) = delivery {
            tracing::error!(error = %err, "Failed to spawn rejection thread");
        }
    }

    /// Cancel every request submitted so far that has not started rendering.
    ///
    /// Returns the new epoch.
    pub fn cancel_all(&self) -> u64 {
        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::info!(epoch, pending = self.stats().pending(), "Cancelling pending requests");
        epoch
    }

    /// Current cancellation epoch.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Block until every request submitted before this call is terminal.
    ///
    /// Must not be called from the lane itself, e.g. inside a completion
    /// callback.
    pub fn flush(&self) {
        let Some(tx) = &self.tx else {
            return;
        };
        let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
        if tx.send(LaneMessage::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }

    pub fn stats(&self) -> LaneStats {
        self.counters.snapshot()
    }

    /// Stop accepting requests, let the lane drain what is queued, and join
    /// the worker thread. Idempotent.
    pub fn shutdown(&mut self) {
        drop(self.tx.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!(lane = %self.lane_name, "Render lane panicked during shutdown");
            }
        }
    }

    /// Whether the lane still accepts requests.
    pub fn is_running(&self) -> bool {
        self.tx.is_some()
    }
}

impl Drop for RequestScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for RequestScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestScheduler")
            .field("lane", &self.lane_name)
            .field("epoch", &self.epoch())
            .field("stats", &self.stats())
            .finish()
    }
}
