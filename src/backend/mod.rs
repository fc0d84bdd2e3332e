//! Encoder backend interface
//!
//! The pipeline talks to the actual encoder (VideoToolbox, libavcodec, a
//! GStreamer pipeline, ...) exclusively through these traits.

pub mod traits;

pub use traits::{CloseAck, EncoderBackend, EncoderHandle, FrameAck, FrameRef};
