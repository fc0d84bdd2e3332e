//! Presentation timestamp sequencing
//!
//! Assigns pause-excluded, strictly increasing presentation timestamps from
//! the capture times the rendering context reports.

use std::time::{Duration, Instant};

/// Timestamp assignment and duration accounting for one session.
///
/// The first admitted frame establishes the session's time origin; every
/// later frame is stamped `capture - origin - paused`, where `paused` is the
/// accumulated wall-clock time spent in the Paused state. Capture times and
/// pause instants must come from the same monotonic clock.
pub struct TimestampSequencer {
    /// Capture time of the first admitted frame
    origin: Option<Duration>,

    /// Last assigned presentation timestamp
    last: Option<Duration>,

    /// Sum of completed pause intervals
    pause_accumulator: Duration,

    /// Start of the pause interval currently open, if paused
    pause_started: Option<Instant>,
}

impl TimestampSequencer {
    pub fn new() -> Self {
        Self {
            origin: None,
            last: None,
            pause_accumulator: Duration::ZERO,
            pause_started: None,
        }
    }

    /// Assign a presentation timestamp to a frame captured at `capture`.
    ///
    /// The first admitted frame establishes the session origin and always
    /// stamps zero; a pause completed before any frame was admitted is folded
    /// into the origin, not subtracted from the recording. Returns `None`
    /// when the frame must be dropped: its timestamp would not advance past
    /// the last assigned one (out-of-order or duplicate capture times), or
    /// the pause exclusion would move it before the origin. Rejected frames
    /// do not advance any sequencer state.
    pub fn stamp(&mut self, capture: Duration) -> Option<Duration> {
        let origin = match self.origin {
            Some(origin) => origin,
            None => {
                self.origin = Some(capture);
                self.pause_accumulator = Duration::ZERO;
                self.last = Some(Duration::ZERO);
                return Some(Duration::ZERO);
            }
        };

        let since_origin = match capture.checked_sub(origin) {
            Some(d) => d,
            None => {
                tracing::debug!(?capture, ?origin, "capture time predates session origin");
                return None;
            }
        };
        let timestamp = match since_origin.checked_sub(self.pause_accumulator) {
            Some(d) => d,
            None => {
                tracing::debug!(?capture, "capture time swallowed by pause interval");
                return None;
            }
        };

        if let Some(last) = self.last {
            if timestamp <= last {
                tracing::debug!(?timestamp, ?last, "non-monotonic timestamp rejected");
                return None;
            }
        }

        self.last = Some(timestamp);
        Some(timestamp)
    }

    /// Open a pause interval at `now`. No-op if one is already open.
    pub fn pause_at(&mut self, now: Instant) {
        if self.pause_started.is_none() {
            self.pause_started = Some(now);
        }
    }

    /// Close the open pause interval at `now`, adding its length to the
    /// accumulator. No-op if no interval is open.
    pub fn resume_at(&mut self, now: Instant) {
        if let Some(started) = self.pause_started.take() {
            self.pause_accumulator += now.saturating_duration_since(started);
        }
    }

    /// Recorded duration so far: the last assigned timestamp.
    ///
    /// Monotonically non-decreasing; zero before the first frame.
    pub fn duration(&self) -> Duration {
        self.last.unwrap_or(Duration::ZERO)
    }
}

impl Default for TimestampSequencer {
    fn default() -> Self {
        Self::new()
    }
}
