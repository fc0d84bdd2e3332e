//! Encoder readiness gate
//!
//! Backpressure check consulted by the ingest path before a frame is
//! admitted. Pure lock-free read so the rendering thread can query it while
//! the encoding thread mutates session state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Owner-supplied "can the encoder take another frame" predicate
pub type ReadyPredicate = Arc<dyn Fn() -> bool + Send + Sync>;

/// Readiness latch combined with the backend's own availability signal.
///
/// The latch is closed until `start` succeeds and forced closed again once
/// finishing, cancellation, or failure begins, so no frame is admitted while
/// the session is torn down mid-frame.
pub struct ReadinessGate {
    latch: AtomicBool,
    predicate: Option<ReadyPredicate>,
}

impl ReadinessGate {
    pub fn new(predicate: Option<ReadyPredicate>) -> Self {
        Self {
            latch: AtomicBool::new(false),
            predicate,
        }
    }

    /// True when the latch is open and the owner predicate (if any) agrees
    pub fn is_ready(&self) -> bool {
        if !self.latch.load(Ordering::Acquire) {
            return false;
        }
        self.predicate.as_ref().map_or(true, |ready| ready())
    }

    /// Open the latch (recording started)
    pub fn open(&self) {
        self.latch.store(true, Ordering::Release);
    }

    /// Force the latch closed (finishing/cancelled/failed)
    pub fn close(&self) {
        self.latch.store(false, Ordering::Release);
    }
}
