//! framesink - presentation-ordered video frame encoding pipeline.
//!
//! Accepts rendered frames from a GPU rendering context, stamps them with
//! pause-excluded presentation timestamps, and drives an external encoder
//! backend through the full recording lifecycle (start, pause/resume,
//! finish, cancel) under concurrent access from a rendering thread, an
//! encoding thread, and application threads.
//!
//! The encoder itself (and the container it writes) lives behind the
//! [`backend::EncoderBackend`] seam; this crate owns admission, timestamping,
//! backpressure, drain-on-finish, and exactly-once terminal notification.
//!
//! ```no_run
//! use std::sync::Arc;
//! use framesink::{OutputSize, PipelineController, SessionCallbacks};
//! # fn backend() -> Arc<dyn framesink::backend::EncoderBackend> { unimplemented!() }
//!
//! let callbacks = SessionCallbacks::new()
//!     .on_completion(|| println!("recording written"))
//!     .on_failure(|error| eprintln!("recording failed: {error}"));
//! let controller = PipelineController::new(backend(), callbacks);
//!
//! controller.start(OutputSize::new(1920, 1080));
//! // rendering thread, per frame:
//! //   controller.submit(frame, capture_time);
//! controller.finish();
//! ```

pub mod backend;
pub mod pipeline;
pub mod utils;

pub use backend::{EncoderBackend, EncoderHandle, FrameRef};
pub use pipeline::{
    DropReason, MetadataEntry, OrientationTransform, OutputSize, PipelineController,
    PipelineEvent, RecordingSession, RecordingState, SessionCallbacks, SubmitOutcome,
    TerminalOutcome,
};
pub use utils::{PipelineError, PipelineResult};
