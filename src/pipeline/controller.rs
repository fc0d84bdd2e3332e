//! Pipeline controller
//!
//! Orchestrates frame ingest, the encoder session state machine, and the
//! recording lifecycle. Lifecycle operations may be called from any thread;
//! session state lives behind a single mutex, and backend acknowledgments
//! arrive as closures invoked on the backend's encoding thread.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::backend::{EncoderBackend, EncoderHandle, FrameAck, FrameRef};
use crate::pipeline::gate::ReadinessGate;
use crate::pipeline::notifier::{
    CompletionNotifier, FinishHandler, Notification, SessionCallbacks,
};
use crate::pipeline::sequencer::TimestampSequencer;
use crate::pipeline::state::{
    MetadataEntry, OrientationTransform, OutputSize, RecordingSession, RecordingState,
    TerminalOutcome,
};
use crate::utils::error::PipelineError;

/// Events emitted during a session
///
/// Best-effort observability channel; the registered callbacks are the
/// authoritative delivery path.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// Recording started
    Started,
    /// Recording paused
    Paused,
    /// Recording resumed
    Resumed,
    /// Drain of pending frames began
    Finishing,
    /// Output finalized
    Finished,
    /// Session aborted on request
    Cancelled,
    /// Session terminated by an error
    Failed(String),
    /// One frame acknowledged (success flag, presentation timestamp in ms)
    FrameWritten { success: bool, timestamp_ms: f64 },
}

/// Result of a `submit` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Frame was stamped and handed to the backend
    Admitted,
    /// Frame was discarded; recording tolerates frame loss, there is no retry
    Dropped(DropReason),
}

/// Why a frame was discarded at ingest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Session is not in the Recording state
    NotRecording,
    /// Ingest is disabled via `set_enabled(false)`
    Disabled,
    /// Readiness gate reports the encoder cannot take another frame
    EncoderBusy,
    /// Presentation timestamp would not advance past the last one
    OutOfOrder,
}

/// A frame handed to the backend but not yet acknowledged
#[derive(Default)]
struct PendingFrame {
    result: Option<Result<(), PipelineError>>,
}

/// Mutable session state, guarded by the controller's mutex
struct SessionCore {
    state: RecordingState,
    handle: Option<Box<dyn EncoderHandle>>,
    sequencer: TimestampSequencer,
    /// Submitted-minus-acknowledged, keyed by presentation timestamp so
    /// out-of-order acknowledgments are released to the owner in order
    pending: BTreeMap<Duration, PendingFrame>,
    /// Stale-acknowledgment filter; bumped on start and cancel
    generation: u64,
    transform: OrientationTransform,
    metadata: Vec<MetadataEntry>,
    session: Option<RecordingSession>,
    outcome: Option<TerminalOutcome>,
    close_requested: bool,
    finish_handler: Option<FinishHandler>,
}

impl SessionCore {
    fn new() -> Self {
        Self {
            state: RecordingState::Idle,
            handle: None,
            sequencer: TimestampSequencer::new(),
            pending: BTreeMap::new(),
            generation: 0,
            transform: OrientationTransform::identity(),
            metadata: Vec::new(),
            session: None,
            outcome: None,
            close_requested: false,
            finish_handler: None,
        }
    }
}

struct Inner {
    core: Mutex<SessionCore>,
    /// Totally orders notification batches; acquired before `core` by every
    /// path that may notify, held across delivery (after `core` is released)
    notify_order: Mutex<()>,
    notifier: CompletionNotifier,
    gate: ReadinessGate,
    enabled: AtomicBool,
    backend: Arc<dyn EncoderBackend>,
    event_tx: broadcast::Sender<PipelineEvent>,
}

/// Drives one encoding session from start to its terminal state.
///
/// Cheaply cloneable; all clones share the same session.
#[derive(Clone)]
pub struct PipelineController {
    inner: Arc<Inner>,
}

impl PipelineController {
    /// Create a controller over `backend` with the owner's callbacks.
    ///
    /// Callbacks are fixed for the session's lifetime.
    pub fn new(backend: Arc<dyn EncoderBackend>, callbacks: SessionCallbacks) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        let gate = ReadinessGate::new(callbacks.encoder_ready.clone());
        Self {
            inner: Arc::new(Inner {
                core: Mutex::new(SessionCore::new()),
                notify_order: Mutex::new(()),
                notifier: CompletionNotifier::new(callbacks),
                gate,
                enabled: AtomicBool::new(true),
                backend,
                event_tx,
            }),
        }
    }

    /// Start recording at the given output size
    pub fn start(&self, size: OutputSize) {
        self.start_session(size, OrientationTransform::identity());
    }

    /// Start recording with a display-orientation transform (pure metadata)
    pub fn start_with_transform(&self, size: OutputSize, transform: OrientationTransform) {
        self.start_session(size, transform);
    }

    fn start_session(&self, size: OutputSize, transform: OrientationTransform) {
        let inner = &self.inner;
        let _order = inner.notify_order.lock();
        let mut batch = Vec::new();
        {
            let mut core = inner.core.lock();
            if core.state != RecordingState::Idle {
                tracing::debug!(state = ?core.state, "start ignored: session already used");
                return;
            }
            if !size.is_valid() {
                let error = PipelineError::InvalidConfiguration(format!(
                    "output size {}x{} has a zero dimension",
                    size.width, size.height
                ));
                inner.fail_session(&mut core, error, &mut batch);
            } else {
                match inner.backend.open(size) {
                    Ok(handle) => {
                        core.handle = Some(handle);
                        core.generation += 1;
                        core.sequencer = TimestampSequencer::new();
                        core.pending.clear();
                        core.transform = transform;
                        core.session = Some(RecordingSession::new(size));
                        core.state = RecordingState::Recording;
                        inner.gate.open();
                        tracing::info!(width = size.width, height = size.height, "recording started");
                        let _ = inner.event_tx.send(PipelineEvent::Started);
                    }
                    Err(error) => {
                        inner.fail_session(&mut core, error, &mut batch);
                    }
                }
            }
        }
        inner.notifier.deliver(batch);
    }

    /// Submit one rendered frame.
    ///
    /// Never blocks beyond brief lock acquisition: the frame is either
    /// admitted (stamped and handed to the backend) or dropped with a reason.
    pub fn submit(&self, frame: FrameRef<'_>, capture_time: Duration) -> SubmitOutcome {
        let mut core = self.inner.core.lock();
        if !core.state.accepts_frames() {
            return SubmitOutcome::Dropped(DropReason::NotRecording);
        }
        if !self.inner.enabled.load(Ordering::Relaxed) {
            return SubmitOutcome::Dropped(DropReason::Disabled);
        }
        if !self.inner.gate.is_ready() {
            tracing::trace!("frame dropped: encoder busy");
            return SubmitOutcome::Dropped(DropReason::EncoderBusy);
        }
        let timestamp = match core.sequencer.stamp(capture_time) {
            Some(timestamp) => timestamp,
            None => return SubmitOutcome::Dropped(DropReason::OutOfOrder),
        };

        if let Some(session) = core.session.as_mut() {
            session.frames_admitted += 1;
        }
        core.pending.insert(timestamp, PendingFrame::default());

        let generation = core.generation;
        let inner = Arc::clone(&self.inner);
        let ack: FrameAck = Box::new(move |result| {
            inner.frame_acknowledged(generation, timestamp, result);
        });
        if let Some(handle) = core.handle.as_mut() {
            handle.submit_frame(frame, timestamp, ack);
        }
        tracing::trace!(timestamp_ms = timestamp.as_secs_f64() * 1000.0, "frame admitted");
        SubmitOutcome::Admitted
    }

    /// Pause recording. Frames are dropped while paused and the paused
    /// interval is excluded from recorded duration. No-op unless Recording.
    pub fn pause(&self) {
        let mut core = self.inner.core.lock();
        if core.state != RecordingState::Recording {
            tracing::debug!(state = ?core.state, "pause ignored");
            return;
        }
        core.sequencer.pause_at(Instant::now());
        core.state = RecordingState::Paused;
        tracing::info!("recording paused");
        let _ = self.inner.event_tx.send(PipelineEvent::Paused);
    }

    /// Resume a paused recording. No-op unless Paused.
    pub fn resume(&self) {
        let mut core = self.inner.core.lock();
        if core.state != RecordingState::Paused {
            tracing::debug!(state = ?core.state, "resume ignored");
            return;
        }
        core.sequencer.resume_at(Instant::now());
        core.state = RecordingState::Recording;
        tracing::info!("recording resumed");
        let _ = self.inner.event_tx.send(PipelineEvent::Resumed);
    }

    /// Begin a graceful drain: no further frames are admitted, all pending
    /// acknowledgments are awaited, then the backend output is finalized.
    /// The outcome is observed through the completion/failure callback.
    pub fn finish(&self) {
        self.finish_internal(None);
    }

    /// Like [`finish`](Self::finish), additionally invoking `handler` after
    /// the standard completion callback, exactly once.
    pub fn finish_with_completion(&self, handler: impl FnOnce() + Send + 'static) {
        self.finish_internal(Some(Box::new(handler)));
    }

    fn finish_internal(&self, handler: Option<FinishHandler>) {
        let mut core = self.inner.core.lock();
        if !matches!(
            core.state,
            RecordingState::Recording | RecordingState::Paused
        ) {
            tracing::debug!(state = ?core.state, "finish ignored");
            return;
        }
        self.inner.gate.close();
        core.state = RecordingState::Finishing;
        core.close_requested = false;
        core.finish_handler = handler;
        tracing::info!(pending = core.pending.len(), "finishing recording");
        let _ = self.inner.event_tx.send(PipelineEvent::Finishing);
        // closes immediately when nothing is pending
        self.inner.request_close(&mut core);
    }

    /// Abort the session without producing output.
    ///
    /// Returns immediately; backend resources may be released later, but no
    /// further frames are accepted once this returns. Neither the completion
    /// nor the failure callback fires for a cancelled session.
    pub fn cancel(&self) {
        let mut core = self.inner.core.lock();
        if !matches!(
            core.state,
            RecordingState::Recording | RecordingState::Paused | RecordingState::Finishing
        ) {
            tracing::debug!(state = ?core.state, "cancel ignored");
            return;
        }
        self.inner.gate.close();
        // in-flight acknowledgments become stale and are ignored
        core.generation += 1;
        core.pending.clear();
        core.finish_handler = None;
        if let Some(mut handle) = core.handle.take() {
            handle.abort();
        }
        let duration = core.sequencer.duration();
        if let Some(session) = core.session.as_mut() {
            session.end(duration);
        }
        core.state = RecordingState::Cancelled;
        core.outcome = Some(TerminalOutcome::Cancelled);
        tracing::info!("recording cancelled");
        let _ = self.inner.event_tx.send(PipelineEvent::Cancelled);
    }

    /// Current lifecycle state
    pub fn state(&self) -> RecordingState {
        self.inner.core.lock().state
    }

    /// Recorded duration so far (pause time excluded)
    pub fn duration(&self) -> Duration {
        self.inner.core.lock().sequencer.duration()
    }

    /// Whether the session is currently paused
    pub fn is_paused(&self) -> bool {
        self.inner.core.lock().state == RecordingState::Paused
    }

    /// Whether the next frame would pass the readiness gate.
    /// Lock-free; safe to poll from the rendering thread.
    pub fn is_ready(&self) -> bool {
        self.inner.gate.is_ready()
    }

    /// Enable or disable frame ingest without touching the state machine
    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Relaxed)
    }

    /// The orientation transform recorded at start
    pub fn transform(&self) -> OrientationTransform {
        self.inner.core.lock().transform
    }

    /// Attach owner-supplied container metadata.
    ///
    /// Pure pass-through for the owner/backend to write into the container.
    /// Must be set before `start`; once the session has started the metadata
    /// is immutable and later calls are ignored.
    pub fn set_metadata(&self, metadata: Vec<MetadataEntry>) {
        let mut core = self.inner.core.lock();
        if core.state != RecordingState::Idle {
            tracing::debug!(state = ?core.state, "set_metadata ignored: session already started");
            return;
        }
        core.metadata = metadata;
    }

    /// The container metadata registered before start
    pub fn metadata(&self) -> Vec<MetadataEntry> {
        self.inner.core.lock().metadata.clone()
    }

    /// Snapshot of the session bookkeeping, if a session was started
    pub fn session(&self) -> Option<RecordingSession> {
        self.inner.core.lock().session.clone()
    }

    /// The terminal outcome, once one has been reached
    pub fn outcome(&self) -> Option<TerminalOutcome> {
        self.inner.core.lock().outcome.clone()
    }

    /// Frames handed to the backend and not yet acknowledged
    pub fn pending_frames(&self) -> usize {
        self.inner.core.lock().pending.len()
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.inner.event_tx.subscribe()
    }
}

impl Inner {
    /// Per-frame acknowledgment from the backend's encoding thread
    fn frame_acknowledged(
        self: &Arc<Self>,
        generation: u64,
        timestamp: Duration,
        result: Result<(), PipelineError>,
    ) {
        let _order = self.notify_order.lock();
        let mut batch = Vec::new();
        {
            let mut core = self.core.lock();
            if core.generation != generation || core.state.is_terminal() {
                tracing::trace!(?timestamp, "stale frame acknowledgment ignored");
                return;
            }
            let Some(entry) = core.pending.get_mut(&timestamp) else {
                return;
            };
            entry.result = Some(result);
            self.release_acknowledged(&mut core, &mut batch);
            self.request_close(&mut core);
        }
        self.notifier.deliver(batch);
    }

    /// Release the acknowledged prefix of the pending map in timestamp order.
    ///
    /// A frame failure surfacing while Finishing escalates to session failure;
    /// during Recording/Paused it is reported and tolerated.
    fn release_acknowledged(&self, core: &mut SessionCore, batch: &mut Vec<Notification>) {
        loop {
            let (timestamp, result) = match core.pending.iter().next() {
                Some((&timestamp, entry)) => match &entry.result {
                    Some(result) => (timestamp, result.clone()),
                    None => break,
                },
                None => break,
            };
            core.pending.remove(&timestamp);

            let success = result.is_ok();
            if let Some(session) = core.session.as_mut() {
                if success {
                    session.frames_written += 1;
                } else {
                    session.frames_failed += 1;
                }
            }
            batch.push(Notification::FrameWritten { success, timestamp });
            let _ = self.event_tx.send(PipelineEvent::FrameWritten {
                success,
                timestamp_ms: timestamp.as_secs_f64() * 1000.0,
            });

            if let Err(error) = result {
                if core.state == RecordingState::Finishing {
                    // a clean stop must account for every frame it waited on
                    self.fail_session(core, error, batch);
                    break;
                }
                tracing::debug!(%error, ?timestamp, "frame write failed, continuing");
            }
        }
    }

    /// Request backend close once the drain is complete
    fn request_close(self: &Arc<Self>, core: &mut SessionCore) {
        if core.state != RecordingState::Finishing
            || !core.pending.is_empty()
            || core.close_requested
        {
            return;
        }
        core.close_requested = true;
        let generation = core.generation;
        let inner = Arc::clone(self);
        if let Some(handle) = core.handle.as_mut() {
            tracing::debug!("all pending frames acknowledged, closing encoder");
            handle.close(Box::new(move |result| {
                inner.close_acknowledged(generation, result);
            }));
        }
    }

    /// Close acknowledgment from the backend's encoding thread
    fn close_acknowledged(self: &Arc<Self>, generation: u64, result: Result<(), PipelineError>) {
        let _order = self.notify_order.lock();
        let mut batch = Vec::new();
        {
            let mut core = self.core.lock();
            if core.generation != generation || core.state != RecordingState::Finishing {
                tracing::trace!("stale close acknowledgment ignored");
                return;
            }
            match result {
                Ok(()) => {
                    let duration = core.sequencer.duration();
                    core.handle = None;
                    core.state = RecordingState::Finished;
                    if let Some(session) = core.session.as_mut() {
                        session.end(duration);
                    }
                    core.outcome = Some(TerminalOutcome::Finished(duration));
                    tracing::info!(
                        duration_ms = duration.as_secs_f64() * 1000.0,
                        "recording finished"
                    );
                    batch.push(Notification::Finished {
                        handler: core.finish_handler.take(),
                    });
                    let _ = self.event_tx.send(PipelineEvent::Finished);
                }
                Err(error) => {
                    self.fail_session(&mut core, error, &mut batch);
                }
            }
        }
        self.notifier.deliver(batch);
    }

    /// Transition to Failed: tear the backend down, fix the outcome, queue
    /// the failure notification. Caller delivers the batch.
    fn fail_session(
        &self,
        core: &mut SessionCore,
        error: PipelineError,
        batch: &mut Vec<Notification>,
    ) {
        self.gate.close();
        core.pending.clear();
        core.finish_handler = None;
        if let Some(mut handle) = core.handle.take() {
            handle.abort();
        }
        let duration = core.sequencer.duration();
        if let Some(session) = core.session.as_mut() {
            session.end(duration);
        }
        core.state = RecordingState::Failed;
        core.outcome = Some(TerminalOutcome::Failed(error.clone()));
        batch.push(Notification::Failed(error.clone()));
        let _ = self.event_tx.send(PipelineEvent::Failed(error.to_string()));
    }
}
