//! Acquisition session state machine
//!
//! `AcquisitionSession` is synchronous and owns no I/O. The async runner feeds
//! it readings and ticks and acts on what it returns. One type covers both
//! modes; the mode decides how readings are kept and which ladder the
//! scheduler evaluates.

use crate::algorithms::{ConvergenceScheduler, Decision};
use crate::api::types::{
    AcquisitionError, AcquisitionResult, FixProvenance, ProgressUpdate, RejectionReason,
    ResolvedFix, SessionId, SessionState,
};
use crate::core::{AcquisitionMode, FixOrigin, LocationFix};
use crate::processing::{select, CandidateStore, SourceClassifier, SourceLabel};
use crate::utils::ModePolicy;

/// What happened to one reading
#[derive(Debug, Clone, PartialEq)]
pub enum ReadingDisposition {
    Accepted,
    Rejected(RejectionReason),
    /// The session is not active
    Ignored,
}

/// What one tick decided
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The session is not active
    Ignored,
    Continue(ProgressUpdate),
    Completed(ProgressUpdate, ResolvedFix),
    /// The time bound passed without any usable reading
    TimedOut(ProgressUpdate),
}

/// One acquisition attempt
#[derive(Debug)]
pub struct AcquisitionSession {
    id: SessionId,
    mode: AcquisitionMode,
    state: SessionState,
    started_at_ms: Option<u64>,
    classifier: SourceClassifier,
    candidates: CandidateStore,
    latest: Option<LocationFix>,
    best_so_far: Option<LocationFix>,
    scheduler: ConvergenceScheduler,
}

impl AcquisitionSession {
    pub fn new(id: SessionId, policy: &ModePolicy, classifier: SourceClassifier) -> Self {
        Self {
            id,
            mode: policy.providers.mode(),
            state: SessionState::Idle,
            started_at_ms: None,
            classifier,
            candidates: CandidateStore::new(),
            latest: None,
            best_so_far: None,
            scheduler: ConvergenceScheduler::new(
                policy.ladder.clone(),
                policy.tick_interval(),
                policy.timeout_secs,
            ),
        }
    }

    /// Idle → Requesting
    pub fn begin(&mut self, now_ms: u64) -> AcquisitionResult<()> {
        if self.state != SessionState::Idle {
            return Err(AcquisitionError::InvalidState {
                expected: SessionState::Idle,
                actual: self.state,
            });
        }
        self.state = SessionState::Requesting;
        self.started_at_ms = Some(now_ms);
        Ok(())
    }

    /// Offer a last-known fix as an initial candidate.
    ///
    /// Accepted only in coarse mode, when the fix classifies as coarse and is
    /// younger than `max_age_secs`.
    pub fn seed(&mut self, fix: LocationFix, now_ms: u64, max_age_secs: u64) -> bool {
        if self.mode != AcquisitionMode::Coarse || !self.state.is_active() {
            return false;
        }
        if self.classifier.classify(&fix, now_ms) != FixOrigin::Coarse {
            return false;
        }
        if fix.age_ms(now_ms) >= max_age_secs.saturating_mul(1000) {
            return false;
        }

        self.candidates.add(fix);
        self.state = SessionState::Converging;
        true
    }

    pub fn on_reading(&mut self, fix: LocationFix, now_ms: u64) -> ReadingDisposition {
        if !self.state.is_active() {
            return ReadingDisposition::Ignored;
        }

        match self.mode {
            AcquisitionMode::Coarse => match self.classifier.classify(&fix, now_ms) {
                FixOrigin::Precise => ReadingDisposition::Rejected(RejectionReason::PreciseOrigin { fix }),
                FixOrigin::Coarse => {
                    self.candidates.add(fix);
                    self.state = SessionState::Converging;
                    ReadingDisposition::Accepted
                }
            },
            AcquisitionMode::Precise => {
                self.latest = Some(fix);
                self.state = SessionState::Converging;
                ReadingDisposition::Accepted
            }
        }
    }

    /// Advance the scheduler by one interval and evaluate the mode's best fix
    pub fn on_tick(&mut self) -> TickOutcome {
        if !self.state.is_active() {
            return TickOutcome::Ignored;
        }

        self.best_so_far = self.current_best();
        let accuracy = self.best_so_far.as_ref().map(|fix| fix.accuracy_m);
        let evaluation = self.scheduler.tick(accuracy);

        if evaluation.decision == Decision::Continue {
            let message = self.progress_message(evaluation.elapsed_secs);
            return TickOutcome::Continue(ProgressUpdate {
                percent: evaluation.progress,
                message,
                elapsed_secs: evaluation.elapsed_secs,
            });
        }

        match self.best_so_far.clone() {
            Some(fix) => {
                self.state = SessionState::Completed;
                let progress = ProgressUpdate {
                    percent: evaluation.progress,
                    message: format!("Location found with accuracy: {}m", fix.accuracy_m as i64),
                    elapsed_secs: evaluation.elapsed_secs,
                };
                TickOutcome::Completed(progress, ResolvedFix::from_reading(fix, FixProvenance::SessionBest))
            }
            None => {
                self.state = SessionState::TimedOut;
                let message = self.progress_message(evaluation.elapsed_secs);
                TickOutcome::TimedOut(ProgressUpdate {
                    percent: evaluation.progress,
                    message,
                    elapsed_secs: evaluation.elapsed_secs,
                })
            }
        }
    }

    /// Move to Cancelled; false if the session had already ended
    pub fn cancel(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = SessionState::Cancelled;
        true
    }

    /// The mode's best selection right now
    pub fn current_best(&self) -> Option<LocationFix> {
        match self.mode {
            AcquisitionMode::Coarse => select(self.candidates.all()).ok().cloned(),
            AcquisitionMode::Precise => self.latest.clone(),
        }
    }

    fn progress_message(&self, elapsed_secs: u64) -> String {
        match (self.mode, &self.best_so_far) {
            (AcquisitionMode::Coarse, None) => {
                format!("Searching for network location (elapsed {}s)", elapsed_secs)
            }
            (AcquisitionMode::Coarse, Some(best)) => format!(
                "Improving accuracy from {}: current {}m, elapsed {}s",
                SourceLabel::for_fix(best),
                best.accuracy_m as i64,
                elapsed_secs
            ),
            (AcquisitionMode::Precise, None) => "Waiting for first fix".to_string(),
            (AcquisitionMode::Precise, Some(latest)) => {
                format!("Current accuracy: {}m", latest.accuracy_m as i64)
            }
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn mode(&self) -> AcquisitionMode {
        self.mode
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn started_at_ms(&self) -> Option<u64> {
        self.started_at_ms
    }

    pub fn candidates(&self) -> &CandidateStore {
        &self.candidates
    }

    pub fn latest(&self) -> Option<&LocationFix> {
        self.latest.as_ref()
    }

    /// Best selection as of the last tick
    pub fn best_so_far(&self) -> Option<&LocationFix> {
        self.best_so_far.as_ref()
    }

    pub fn progress(&self) -> u8 {
        self.scheduler.progress()
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.scheduler.elapsed().as_secs()
    }
}
