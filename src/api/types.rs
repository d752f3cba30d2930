//! Common API types and data structures

use crate::core::{AcquisitionMode, GeoPoint, LocationFix};
use crate::processing::SourceLabel;
use crate::provider::ProviderError;
use crate::utils::ConfigError;
use std::fmt;
use thiserror::Error;

/// Result type for API operations
pub type AcquisitionResult<T> = Result<T, AcquisitionError>;

/// API error types
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("{mode} location permission not granted")]
    PermissionDenied { mode: AcquisitionMode },

    #[error("provider {provider} unavailable")]
    ProviderUnavailable {
        provider: String,
        #[source]
        source: ProviderError,
    },

    #[error("invalid session state: expected {expected}, found {actual}")]
    InvalidState {
        expected: SessionState,
        actual: SessionState,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("session runner aborted")]
    SessionAborted,
}

/// Lifecycle of one acquisition session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// Subscribed, no usable reading yet
    Requesting,
    /// At least one usable reading
    Converging,
    Completed,
    Cancelled,
    TimedOut,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Cancelled | SessionState::TimedOut
        )
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Requesting | SessionState::Converging)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Requesting => "requesting",
            SessionState::Converging => "converging",
            SessionState::Completed => "completed",
            SessionState::Cancelled => "cancelled",
            SessionState::TimedOut => "timed out",
        };
        f.write_str(name)
    }
}

/// Session identifier, unique per acquirer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// How a reported fix was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixProvenance {
    /// Selected from this session's own readings
    SessionBest,
    /// Coarse provider's last-known fix
    LastKnown,
    /// Passive cache
    PassiveCache,
    /// Configured approximate default
    ApproximateDefault,
}

/// A fix ready to hand to the caller
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFix {
    pub fix: LocationFix,
    pub source: SourceLabel,
    pub provenance: FixProvenance,
    /// True only for the approximate default
    pub approximate: bool,
}

impl ResolvedFix {
    pub fn from_reading(fix: LocationFix, provenance: FixProvenance) -> Self {
        let source = SourceLabel::for_fix(&fix);
        Self {
            fix,
            source,
            provenance,
            approximate: false,
        }
    }

    pub fn approximate(point: GeoPoint, accuracy_m: f32, now_ms: u64) -> Self {
        Self {
            fix: LocationFix::new(point.latitude, point.longitude, accuracy_m, now_ms),
            source: SourceLabel::Approximate,
            provenance: FixProvenance::ApproximateDefault,
            approximate: true,
        }
    }

    /// One-line summary such as "Cell Tower/WiFi (Accuracy: 85m)"
    pub fn describe(&self) -> String {
        format!("{} (Accuracy: {}m)", self.source, self.fix.accuracy_m as i64)
    }
}

/// Why a session ended as cancelled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller asked to stop
    User,
    /// A newer session replaced this one
    Superseded,
    /// A required feed could not be opened; carries the user-facing message
    ProviderUnavailable(String),
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::User => f.write_str("Location search cancelled"),
            CancelReason::Superseded => f.write_str("Replaced by a new location request"),
            CancelReason::ProviderUnavailable(message) => f.write_str(message),
        }
    }
}

/// Why a reading was not used
#[derive(Debug, Clone, PartialEq)]
pub enum RejectionReason {
    /// A coarse session received a precise-origin reading
    PreciseOrigin { fix: LocationFix },
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::PreciseOrigin { .. } => {
                f.write_str("GPS location detected, waiting for network location...")
            }
        }
    }
}

/// Periodic progress report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// 0..=100, never decreasing within a session
    pub percent: u8,
    pub message: String,
    pub elapsed_secs: u64,
}

/// Terminal result of a session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Completed(ResolvedFix),
    Cancelled {
        fix: Option<ResolvedFix>,
        reason: CancelReason,
    },
    TimedOut {
        fix: Option<ResolvedFix>,
    },
}

impl SessionOutcome {
    pub fn fix(&self) -> Option<&ResolvedFix> {
        match self {
            SessionOutcome::Completed(fix) => Some(fix),
            SessionOutcome::Cancelled { fix, .. } | SessionOutcome::TimedOut { fix } => fix.as_ref(),
        }
    }

    pub fn state(&self) -> SessionState {
        match self {
            SessionOutcome::Completed(_) => SessionState::Completed,
            SessionOutcome::Cancelled { .. } => SessionState::Cancelled,
            SessionOutcome::TimedOut { .. } => SessionState::TimedOut,
        }
    }
}

/// Everything a session reports to its observer, in emission order
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Progress(ProgressUpdate),
    Rejected(RejectionReason),
    Completed(ResolvedFix),
    Cancelled {
        fix: Option<ResolvedFix>,
        reason: CancelReason,
    },
    TimedOut {
        fix: Option<ResolvedFix>,
    },
}

impl From<SessionOutcome> for SessionEvent {
    fn from(outcome: SessionOutcome) -> Self {
        match outcome {
            SessionOutcome::Completed(fix) => SessionEvent::Completed(fix),
            SessionOutcome::Cancelled { fix, reason } => SessionEvent::Cancelled { fix, reason },
            SessionOutcome::TimedOut { fix } => SessionEvent::TimedOut { fix },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!SessionState::Idle.is_terminal());
        assert!(!SessionState::Converging.is_terminal());
        assert!(SessionState::Completed.is_terminal());
        assert!(SessionState::Cancelled.is_terminal());
        assert!(SessionState::TimedOut.is_terminal());
        assert!(SessionState::Requesting.is_active());
        assert!(!SessionState::TimedOut.is_active());
    }

    #[test]
    fn test_resolved_fix_labels() {
        let fix = LocationFix::new(51.5, -0.12, 85.4, 1_000).with_origin("network");
        let resolved = ResolvedFix::from_reading(fix, FixProvenance::SessionBest);
        assert_eq!(resolved.source, SourceLabel::CellTowerWifi);
        assert!(!resolved.approximate);
        assert_eq!(resolved.describe(), "Cell Tower/WiFi (Accuracy: 85m)");

        let default = ResolvedFix::approximate(
            GeoPoint { latitude: 40.7128, longitude: -74.0060 },
            5000.0,
            2_000,
        );
        assert!(default.approximate);
        assert_eq!(default.provenance, FixProvenance::ApproximateDefault);
        assert_eq!(default.fix.origin_tag, None);
        assert_eq!(default.source.to_string(), "Approximate Location");
    }

    #[test]
    fn test_outcome_accessors() {
        let outcome = SessionOutcome::TimedOut { fix: None };
        assert_eq!(outcome.state(), SessionState::TimedOut);
        assert!(outcome.fix().is_none());

        let outcome = SessionOutcome::Cancelled {
            fix: None,
            reason: CancelReason::ProviderUnavailable("Network location not available".into()),
        };
        assert_eq!(outcome.state(), SessionState::Cancelled);
        assert!(matches!(SessionEvent::from(outcome), SessionEvent::Cancelled { .. }));
    }

    #[test]
    fn test_error_messages() {
        let error = AcquisitionError::PermissionDenied { mode: AcquisitionMode::Precise };
        assert_eq!(error.to_string(), "precise location permission not granted");

        let error = AcquisitionError::InvalidState {
            expected: SessionState::Idle,
            actual: SessionState::Converging,
        };
        assert_eq!(error.to_string(), "invalid session state: expected idle, found converging");
    }
}
