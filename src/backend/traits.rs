//! Encoder backend trait definitions
//!
//! Interface boundary to the hardware/software encoder. The pipeline owns the
//! handle returned by [`EncoderBackend::open`] and drives it under its session
//! lock; the backend reports per-frame and close results asynchronously by
//! invoking the acknowledgment closures from its own encoding thread.

use std::time::Duration;

use crate::pipeline::state::OutputSize;
use crate::utils::error::PipelineError;

/// Borrowed view of one rendered frame.
///
/// Valid only for the duration of the synchronous `submit_frame` call.
/// Backends that encode asynchronously must copy or retain the pixel data
/// before returning; the pipeline never stores this borrow.
#[derive(Debug, Clone, Copy)]
pub struct FrameRef<'a> {
    /// Raw pixel data (BGRA format)
    pub data: &'a [u8],

    /// Frame width in pixels
    pub width: u32,

    /// Frame height in pixels
    pub height: u32,

    /// Bytes per row (may include padding)
    pub bytes_per_row: u32,
}

/// Acknowledgment for one submitted frame.
pub type FrameAck = Box<dyn FnOnce(Result<(), PipelineError>) + Send>;

/// Acknowledgment for a close request.
pub type CloseAck = Box<dyn FnOnce(Result<(), PipelineError>) + Send>;

/// Factory for encoder handles.
pub trait EncoderBackend: Send + Sync {
    /// Allocate and start an encoder sized to `size`.
    fn open(&self, size: OutputSize) -> Result<Box<dyn EncoderHandle>, PipelineError>;
}

/// One open encoder instance.
///
/// Acknowledgment closures must not be invoked from inside `submit_frame` or
/// `close`; they re-enter the pipeline's session lock. Deliver them from the
/// backend's encoding thread once the frame (or the container trailer) has
/// actually been written.
pub trait EncoderHandle: Send {
    /// Hand one frame to the encoder with its presentation timestamp.
    ///
    /// Must not block; `ack` fires later with the write result.
    fn submit_frame(&mut self, frame: FrameRef<'_>, timestamp: Duration, ack: FrameAck);

    /// Finalize the output. `ack` fires once the container is closed.
    fn close(&mut self, ack: CloseAck);

    /// Tear down without producing valid output. No acknowledgment follows;
    /// any already-pending acknowledgments may still fire and will be ignored.
    fn abort(&mut self);
}
