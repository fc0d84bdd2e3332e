//! Completion notification delivery
//!
//! Owner-supplied callbacks, registered once before `start` and delivered
//! strictly serialized: per-frame notifications in increasing timestamp
//! order, the terminal notification last, never two callbacks concurrently
//! for the same session.

use std::time::Duration;

use parking_lot::Mutex;

use crate::pipeline::gate::ReadyPredicate;
use crate::utils::error::PipelineError;

/// Callback invoked when the session completes successfully
pub type CompletionCallback = Box<dyn FnMut() + Send>;

/// Callback invoked when the session fails
pub type FailureCallback = Box<dyn FnMut(&PipelineError) + Send>;

/// Callback invoked per frame acknowledgment: (written ok, presentation timestamp)
pub type FrameWrittenCallback = Box<dyn FnMut(bool, Duration) + Send>;

/// One-shot handler passed to `finish_with_completion`
pub type FinishHandler = Box<dyn FnOnce() + Send>;

/// Owner-supplied callbacks for one session.
///
/// Registered before `start` and immutable for the session's lifetime.
/// Every field is optional; an unset callback is simply skipped.
#[derive(Default)]
pub struct SessionCallbacks {
    pub(crate) on_completion: Option<CompletionCallback>,
    pub(crate) on_failure: Option<FailureCallback>,
    pub(crate) on_frame_written: Option<FrameWrittenCallback>,
    pub(crate) encoder_ready: Option<ReadyPredicate>,
}

impl SessionCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoked exactly once when the session finishes cleanly
    pub fn on_completion(mut self, callback: impl FnMut() + Send + 'static) -> Self {
        self.on_completion = Some(Box::new(callback));
        self
    }

    /// Invoked exactly once when the session fails
    pub fn on_failure(mut self, callback: impl FnMut(&PipelineError) + Send + 'static) -> Self {
        self.on_failure = Some(Box::new(callback));
        self
    }

    /// Invoked for every acknowledged frame, in presentation-timestamp order
    pub fn on_frame_written(
        mut self,
        callback: impl FnMut(bool, Duration) + Send + 'static,
    ) -> Self {
        self.on_frame_written = Some(Box::new(callback));
        self
    }

    /// Backend availability predicate consulted by the readiness gate
    pub fn encoder_ready(mut self, predicate: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.encoder_ready = Some(std::sync::Arc::new(predicate));
        self
    }
}

/// One queued notification
pub(crate) enum Notification {
    FrameWritten {
        success: bool,
        timestamp: Duration,
    },
    /// Clean completion; the optional finish handler runs after the
    /// completion callback
    Finished {
        handler: Option<FinishHandler>,
    },
    Failed(PipelineError),
}

/// Serialized delivery of notification batches.
///
/// Callers collect a batch while holding the session lock, release it, and
/// deliver here; the notifier's own mutex totally orders batches so owner
/// callbacks never run concurrently.
pub(crate) struct CompletionNotifier {
    callbacks: Mutex<SessionCallbacks>,
}

impl CompletionNotifier {
    pub(crate) fn new(callbacks: SessionCallbacks) -> Self {
        Self {
            callbacks: Mutex::new(callbacks),
        }
    }

    pub(crate) fn deliver(&self, batch: Vec<Notification>) {
        if batch.is_empty() {
            return;
        }
        let mut callbacks = self.callbacks.lock();
        for notification in batch {
            match notification {
                Notification::FrameWritten { success, timestamp } => {
                    if let Some(callback) = callbacks.on_frame_written.as_mut() {
                        callback(success, timestamp);
                    }
                }
                Notification::Finished { handler } => {
                    if let Some(callback) = callbacks.on_completion.as_mut() {
                        callback();
                    }
                    if let Some(handler) = handler {
                        handler();
                    }
                }
                Notification::Failed(error) => {
                    tracing::warn!(%error, "session failed");
                    if let Some(callback) = callbacks.on_failure.as_mut() {
                        callback(&error);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_delivery_order_within_batch() {
        let log = Arc::new(Mutex::new(Vec::new()));

        let frames_log = Arc::clone(&log);
        let done_log = Arc::clone(&log);
        let notifier = CompletionNotifier::new(
            SessionCallbacks::new()
                .on_frame_written(move |ok, ts| {
                    frames_log.lock().push(format!("frame {ok} {}", ts.as_millis()));
                })
                .on_completion(move || done_log.lock().push("done".into())),
        );

        let handler_log = Arc::clone(&log);
        notifier.deliver(vec![
            Notification::FrameWritten {
                success: true,
                timestamp: Duration::from_millis(0),
            },
            Notification::FrameWritten {
                success: false,
                timestamp: Duration::from_millis(33),
            },
            Notification::Finished {
                handler: Some(Box::new(move || handler_log.lock().push("handler".into()))),
            },
        ]);

        assert_eq!(
            *log.lock(),
            vec!["frame true 0", "frame false 33", "done", "handler"]
        );
    }

    #[test]
    fn test_unset_callbacks_are_skipped() {
        let notifier = CompletionNotifier::new(SessionCallbacks::new());
        // must not panic
        notifier.deliver(vec![
            Notification::FrameWritten {
                success: true,
                timestamp: Duration::ZERO,
            },
            Notification::Failed(PipelineError::CloseFailure("trailer".into())),
        ]);
    }

    #[test]
    fn test_failure_callback_receives_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let notifier = CompletionNotifier::new(SessionCallbacks::new().on_failure(move |error| {
            assert!(matches!(error, PipelineError::OpenFailure(_)));
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        notifier.deliver(vec![Notification::Failed(PipelineError::OpenFailure(
            "denied".into(),
        ))]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
