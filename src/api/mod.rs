//! Session API
//!
//! `LocationAcquirer` is the entry point. It starts sessions, each driven by
//! its own runner task, and reports through a `SessionObserver`.

pub mod acquirer;
pub mod callback;
pub mod fallback;
pub mod session;
pub mod types;

mod runner;

pub use acquirer::{LocationAcquirer, SessionDeps, SessionHandle};
pub use callback::{dispatch, EventCallback, NoopObserver, SessionObserver};
pub use fallback::FallbackChain;
pub use session::{AcquisitionSession, ReadingDisposition, TickOutcome};
pub use types::{
    AcquisitionError, AcquisitionResult, CancelReason, FixProvenance, ProgressUpdate,
    RejectionReason, ResolvedFix, SessionEvent, SessionId, SessionOutcome, SessionState,
};
