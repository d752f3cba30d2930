//! Callback-based observation of session events
//!
//! A session reports through a `SessionObserver`. Implement the trait for
//! fine-grained hooks, or pass a boxed closure or an unbounded channel sender
//! to receive every event as a `SessionEvent`.

use crate::api::types::{CancelReason, ProgressUpdate, RejectionReason, ResolvedFix, SessionEvent};
use tokio::sync::mpsc;
use tracing::trace;

/// Callback function type for session events
pub type EventCallback = Box<dyn FnMut(SessionEvent) + Send>;

/// Receives progress and the terminal outcome of one session.
///
/// Called from the session runner task, one event at a time. Every method
/// defaults to doing nothing.
pub trait SessionObserver: Send {
    fn on_progress(&mut self, _update: ProgressUpdate) {}

    fn on_rejected_reading(&mut self, _reason: RejectionReason) {}

    fn on_completed(&mut self, _fix: ResolvedFix) {}

    fn on_cancelled(&mut self, _fix: Option<ResolvedFix>, _reason: CancelReason) {}

    fn on_timed_out(&mut self, _fix: Option<ResolvedFix>) {}
}

/// Route an event to the matching observer method
pub fn dispatch(observer: &mut dyn SessionObserver, event: SessionEvent) {
    match event {
        SessionEvent::Progress(update) => observer.on_progress(update),
        SessionEvent::Rejected(reason) => observer.on_rejected_reading(reason),
        SessionEvent::Completed(fix) => observer.on_completed(fix),
        SessionEvent::Cancelled { fix, reason } => observer.on_cancelled(fix, reason),
        SessionEvent::TimedOut { fix } => observer.on_timed_out(fix),
    }
}

impl SessionObserver for EventCallback {
    fn on_progress(&mut self, update: ProgressUpdate) {
        (**self)(SessionEvent::Progress(update))
    }

    fn on_rejected_reading(&mut self, reason: RejectionReason) {
        (**self)(SessionEvent::Rejected(reason))
    }

    fn on_completed(&mut self, fix: ResolvedFix) {
        (**self)(SessionEvent::Completed(fix))
    }

    fn on_cancelled(&mut self, fix: Option<ResolvedFix>, reason: CancelReason) {
        (**self)(SessionEvent::Cancelled { fix, reason })
    }

    fn on_timed_out(&mut self, fix: Option<ResolvedFix>) {
        (**self)(SessionEvent::TimedOut { fix })
    }
}

/// Forwards events into a channel; a dropped receiver discards them
impl SessionObserver for mpsc::UnboundedSender<SessionEvent> {
    fn on_progress(&mut self, update: ProgressUpdate) {
        forward(self, SessionEvent::Progress(update))
    }

    fn on_rejected_reading(&mut self, reason: RejectionReason) {
        forward(self, SessionEvent::Rejected(reason))
    }

    fn on_completed(&mut self, fix: ResolvedFix) {
        forward(self, SessionEvent::Completed(fix))
    }

    fn on_cancelled(&mut self, fix: Option<ResolvedFix>, reason: CancelReason) {
        forward(self, SessionEvent::Cancelled { fix, reason })
    }

    fn on_timed_out(&mut self, fix: Option<ResolvedFix>) {
        forward(self, SessionEvent::TimedOut { fix })
    }
}

fn forward(tx: &mpsc::UnboundedSender<SessionEvent>, event: SessionEvent) {
    if tx.send(event).is_err() {
        trace!("session event receiver dropped");
    }
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}
