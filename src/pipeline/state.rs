//! Recording state management
//!
//! Defines the recording state machine and session bookkeeping.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::error::PipelineError;

/// Current state of the encoding session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    /// No recording in progress
    Idle,
    /// Accepting and encoding frames
    Recording,
    /// Recording is paused; frames are dropped
    Paused,
    /// Draining pending frames before finalizing output
    Finishing,
    /// Output finalized successfully
    Finished,
    /// Aborted without output
    Cancelled,
    /// Terminated by an error
    Failed,
}

impl RecordingState {
    /// Whether this state is absorbing (no further transitions)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled | Self::Failed)
    }

    /// Whether `submit` may admit frames in this state
    pub fn accepts_frames(&self) -> bool {
        matches!(self, Self::Recording)
    }
}

impl Default for RecordingState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Target output dimensions for the encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSize {
    pub width: u32,
    pub height: u32,
}

impl OutputSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Both dimensions non-zero
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Display-orientation transform applied to all frames of a session.
///
/// Pure metadata: the pipeline records it for the owner/container, it never
/// rotates pixels. Row-major 2x3 affine coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientationTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub tx: f64,
    pub ty: f64,
}

impl OrientationTransform {
    pub fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            tx: 0.0,
            ty: 0.0,
        }
    }

    /// Quarter-turn rotation by `degrees` (multiples of 90)
    pub fn rotation_degrees(degrees: i32) -> Self {
        let radians = f64::from(degrees).to_radians();
        let (sin, cos) = radians.sin_cos();
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            tx: 0.0,
            ty: 0.0,
        }
    }
}

impl Default for OrientationTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// One owner-supplied container metadata entry.
///
/// Pure pass-through: recorded for the owner/backend to attach to the
/// container, never interpreted by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataEntry {
    /// Metadata key (e.g. a reverse-DNS identifier)
    pub key: String,

    /// Metadata value
    pub value: String,
}

impl MetadataEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Bookkeeping for one encoding session
///
/// Created on `start`, closed when a terminal state is reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSession {
    /// Unique session ID
    pub id: Uuid,

    /// Output width in pixels
    pub width: u32,

    /// Output height in pixels
    pub height: u32,

    /// Wall-clock time the session started
    pub started_at: DateTime<Utc>,

    /// Wall-clock time the session reached a terminal state
    pub ended_at: Option<DateTime<Utc>>,

    /// Recorded duration in milliseconds (pause time excluded)
    pub duration_ms: f64,

    /// Frames admitted past the ingest checks
    pub frames_admitted: u64,

    /// Frames acknowledged as written by the backend
    pub frames_written: u64,

    /// Frames the backend reported as failed
    pub frames_failed: u64,
}

impl RecordingSession {
    /// Create a new session starting now
    pub fn new(size: OutputSize) -> Self {
        Self {
            id: Uuid::new_v4(),
            width: size.width,
            height: size.height,
            started_at: Utc::now(),
            ended_at: None,
            duration_ms: 0.0,
            frames_admitted: 0,
            frames_written: 0,
            frames_failed: 0,
        }
    }

    /// Close the session with its final duration
    pub fn end(&mut self, duration: Duration) {
        self.ended_at = Some(Utc::now());
        self.duration_ms = duration.as_secs_f64() * 1000.0;
    }
}

/// The single terminal result of a session
#[derive(Debug, Clone, PartialEq)]
pub enum TerminalOutcome {
    /// Output finalized; carries the recorded duration
    Finished(Duration),
    /// Aborted on request, no output
    Cancelled,
    /// Terminated by an error
    Failed(PipelineError),
}
