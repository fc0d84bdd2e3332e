//! Encoding pipeline
//!
//! This module implements the frame encoding pipeline:
//! - PipelineController for ingest and the recording lifecycle
//! - TimestampSequencer for pause-excluded presentation timestamps
//! - ReadinessGate for encoder backpressure
//! - CompletionNotifier for serialized owner callbacks

pub mod controller;
pub mod gate;
pub mod notifier;
pub mod sequencer;
pub mod state;

pub use controller::{DropReason, PipelineController, PipelineEvent, SubmitOutcome};
pub use gate::{ReadinessGate, ReadyPredicate};
pub use notifier::{FinishHandler, SessionCallbacks};
pub use sequencer::TimestampSequencer;
pub use state::{
    MetadataEntry, OrientationTransform, OutputSize, RecordingSession, RecordingState,
    TerminalOutcome,
};
