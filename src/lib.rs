//! Location Acquisition Arbiter
//!
//! Turns a noisy, asynchronous stream of location readings from several
//! providers into one best-effort fix. Sessions are time-bounded, can be
//! cancelled at any point, stop early once accuracy is good enough, and fall
//! back to cached or approximate locations when nothing better arrives.

pub mod core;
pub mod algorithms;
pub mod processing;
pub mod provider;
pub mod utils;
pub mod api;
pub mod logging;

// Re-export commonly used types
pub use crate::core::{AcquisitionMode, Clock, FixOrigin, GeoPoint, LocationFix, ManualClock, SystemClock};
pub use algorithms::{ConvergenceLadder, ConvergenceScheduler, Decision, Evaluation, StopReason};
pub use processing::{select, CandidateStore, SelectError, SourceClassifier, SourceLabel};
pub use provider::{
    CoarseLocationProvider, LocationProvider, MockLocationProvider, MockPermissions, PermissionGate,
    ProviderError, ProviderResult, Subscription, SubscriptionId,
};
pub use utils::{AcquisitionConfig, ConfigError, FallbackConfig, ModePolicy, ProviderSet};
pub use api::{
    AcquisitionError, AcquisitionResult, AcquisitionSession, CancelReason, EventCallback,
    FixProvenance, LocationAcquirer, ProgressUpdate, RejectionReason, ResolvedFix, SessionDeps,
    SessionEvent, SessionHandle, SessionId, SessionObserver, SessionOutcome, SessionState,
};
