//! Per-caller acquisition context
//!
//! `LocationAcquirer` holds at most one running session. Starting a new one
//! cancels the previous session and waits for its runner to finish before the
//! new runner is spawned.

use crate::api::callback::SessionObserver;
use crate::api::runner::SessionRunner;
use crate::api::session::AcquisitionSession;
use crate::api::types::{
    AcquisitionError, AcquisitionResult, CancelReason, SessionId, SessionOutcome,
};
use crate::core::{AcquisitionMode, Clock};
use crate::processing::SourceClassifier;
use crate::provider::{CoarseLocationProvider, LocationProvider, PermissionGate};
use crate::utils::AcquisitionConfig;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Injected collaborators shared by every session
#[derive(Clone)]
pub struct SessionDeps {
    pub precise: Arc<dyn LocationProvider>,
    pub coarse: Arc<dyn CoarseLocationProvider>,
    pub permissions: Arc<dyn PermissionGate>,
    pub clock: Arc<dyn Clock>,
}

/// Cancellation handle for one session.
///
/// Cheap to clone; any clone can cancel. The first reason given wins.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    mode: AcquisitionMode,
    token: CancellationToken,
    reason: Arc<OnceLock<CancelReason>>,
}

impl SessionHandle {
    fn new(id: SessionId, mode: AcquisitionMode) -> Self {
        Self {
            id,
            mode,
            token: CancellationToken::new(),
            reason: Arc::new(OnceLock::new()),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn mode(&self) -> AcquisitionMode {
        self.mode
    }

    /// Ask the session to stop; it resolves a fallback fix and reports Cancelled
    pub fn cancel(&self) {
        self.cancel_with(CancelReason::User);
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    fn cancel_with(&self, reason: CancelReason) {
        let _ = self.reason.set(reason);
        self.token.cancel();
    }
}

struct ActiveSession {
    handle: SessionHandle,
    task: JoinHandle<SessionOutcome>,
}

/// Starts and supervises acquisition sessions
pub struct LocationAcquirer {
    config: AcquisitionConfig,
    deps: SessionDeps,
    next_id: u64,
    active: Option<ActiveSession>,
}

impl LocationAcquirer {
    /// Create an acquirer; the configuration is validated first
    pub fn new(config: AcquisitionConfig, deps: SessionDeps) -> AcquisitionResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            deps,
            next_id: 0,
            active: None,
        })
    }

    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    /// Start a session in `mode`, replacing any session still running.
    ///
    /// Fails with `PermissionDenied` when the mode's grant is missing. Provider
    /// failures are not returned here; they end the session as Cancelled.
    pub async fn start(
        &mut self,
        mode: AcquisitionMode,
        observer: impl SessionObserver + 'static,
    ) -> AcquisitionResult<SessionHandle> {
        if let Some(previous) = self.active.take() {
            previous.handle.cancel_with(CancelReason::Superseded);
            match previous.task.await {
                Ok(outcome) => info!(
                    session_id = %previous.handle.id(),
                    state = %outcome.state(),
                    "previous session replaced"
                ),
                Err(error) => warn!(session_id = %previous.handle.id(), %error, "previous session aborted"),
            }
        }

        let granted = match mode {
            AcquisitionMode::Precise => self.deps.permissions.has_precise(),
            AcquisitionMode::Coarse => self.deps.permissions.has_coarse(),
        };
        if !granted {
            warn!(%mode, "location permission not granted");
            return Err(AcquisitionError::PermissionDenied { mode });
        }

        self.next_id += 1;
        let id = SessionId(self.next_id);
        let policy = self.config.policy(mode).clone();
        let classifier = SourceClassifier::new(self.config.classifier.clone());

        let mut session = AcquisitionSession::new(id, &policy, classifier.clone());
        session.begin(self.deps.clock.now_ms())?;

        let handle = SessionHandle::new(id, mode);
        let runner = SessionRunner::new(
            session,
            policy,
            self.deps.clone(),
            classifier,
            self.config.fallback.clone(),
            Box::new(observer),
            handle.token.clone(),
            Arc::clone(&handle.reason),
        );

        let task = tokio::spawn(runner.run());
        self.active = Some(ActiveSession {
            handle: handle.clone(),
            task,
        });
        Ok(handle)
    }

    /// Wait for the current session to finish; Ok(None) if there is none
    pub async fn wait(&mut self) -> AcquisitionResult<Option<SessionOutcome>> {
        let Some(active) = self.active.take() else {
            return Ok(None);
        };
        active
            .task
            .await
            .map(Some)
            .map_err(|_| AcquisitionError::SessionAborted)
    }

    /// Start a session and wait for its outcome
    pub async fn acquire(
        &mut self,
        mode: AcquisitionMode,
        observer: impl SessionObserver + 'static,
    ) -> AcquisitionResult<SessionOutcome> {
        self.start(mode, observer).await?;
        self.wait().await?.ok_or(AcquisitionError::SessionAborted)
    }

    /// Cancel the current session, if any
    pub fn cancel(&self) {
        if let Some(active) = &self.active {
            active.handle.cancel();
        }
    }

    /// Handle of the current session, if one was started and not yet awaited
    pub fn current(&self) -> Option<&SessionHandle> {
        self.active.as_ref().map(|active| &active.handle)
    }

    /// True while a started session has not finished
    pub fn is_active(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.task.is_finished())
    }
}

impl Drop for LocationAcquirer {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            active.handle.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::callback::NoopObserver;
    use crate::api::types::{FixProvenance, SessionEvent, SessionState};
    use crate::core::{LocationFix, ManualClock};
    use crate::processing::SourceLabel;
    use crate::provider::{MockLocationProvider, MockPermissions, ProviderError};
    use std::time::Duration;
    use tokio::sync::mpsc;

    const NOW: u64 = 1_700_000_000_000;

    struct Harness {
        precise: MockLocationProvider,
        coarse: MockLocationProvider,
        permissions: Arc<MockPermissions>,
        acquirer: LocationAcquirer,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_config(AcquisitionConfig::default())
        }

        fn with_config(config: AcquisitionConfig) -> Self {
            let precise = MockLocationProvider::new("gps");
            let coarse = MockLocationProvider::with_passive_feed("network");
            let permissions = Arc::new(MockPermissions::granted());
            let deps = SessionDeps {
                precise: Arc::new(precise.clone()),
                coarse: Arc::new(coarse.clone()),
                permissions: permissions.clone(),
                clock: Arc::new(ManualClock::new(NOW)),
            };
            let acquirer = LocationAcquirer::new(config, deps).unwrap();
            Self {
                precise,
                coarse,
                permissions,
                acquirer,
            }
        }
    }

    fn network(accuracy_m: f32, age_secs: u64) -> LocationFix {
        LocationFix::new(48.14, 11.58, accuracy_m, NOW - age_secs * 1000).with_origin("network")
    }

    fn gps(accuracy_m: f32) -> LocationFix {
        LocationFix::new(48.14, 11.58, accuracy_m, NOW).with_origin("gps")
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = AcquisitionConfig::default();
        config.coarse.tick_interval_ms = 0;
        let deps = SessionDeps {
            precise: Arc::new(MockLocationProvider::new("gps")),
            coarse: Arc::new(MockLocationProvider::new("network")),
            permissions: Arc::new(MockPermissions::granted()),
            clock: Arc::new(ManualClock::new(NOW)),
        };
        assert!(matches!(
            LocationAcquirer::new(config, deps),
            Err(AcquisitionError::Config(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_coarse_session_converges() {
        let mut harness = Harness::new();
        harness.coarse.push_fix(network(800.0, 0));
        harness.coarse.push_fix(network(250.0, 0));
        harness.coarse.push_fix(network(90.0, 0));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let outcome = harness.acquirer.acquire(AcquisitionMode::Coarse, tx).await.unwrap();

        let fix = match &outcome {
            SessionOutcome::Completed(fix) => fix,
            other => panic!("unexpected outcome: {:?}", other),
        };
        assert_eq!(fix.fix.accuracy_m, 90.0);
        assert_eq!(fix.source, SourceLabel::CellTowerWifi);
        assert_eq!(fix.provenance, FixProvenance::SessionBest);

        let events = drain(&mut rx);
        assert!(matches!(
            events.as_slice(),
            [SessionEvent::Progress(update), SessionEvent::Completed(_)] if update.percent == 100
        ));

        assert_eq!(harness.coarse.subscribe_count(), 2);
        assert_eq!(harness.coarse.unsubscribe_count(), 2);
        assert!(!harness.coarse.is_subscribed());
        assert_eq!(
            harness.coarse.interval_hints(),
            vec![Duration::from_secs(3), Duration::from_secs(3)]
        );
        assert_eq!(harness.precise.subscribe_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_coarse_waits_for_moderate_accuracy() {
        let mut harness = Harness::new();
        harness.coarse.push_fix(network(280.0, 0));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let outcome = harness.acquirer.acquire(AcquisitionMode::Coarse, tx).await.unwrap();
        assert_eq!(outcome.fix().map(|f| f.fix.accuracy_m), Some(280.0));

        let progress: Vec<u8> = drain(&mut rx)
            .into_iter()
            .filter_map(|event| match event {
                SessionEvent::Progress(update) => Some(update.percent),
                _ => None,
            })
            .collect();
        // Ticks at 3..12 s continue, the 15 s tick stops
        assert_eq!(progress.len(), 5);
        assert!(progress.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(progress.last(), Some(&100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_precise_reading_rejected_in_coarse_session() {
        let mut harness = Harness::new();
        harness.coarse.push_fix(gps(5.0));
        harness.coarse.push_fix(network(60.0, 0));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let outcome = harness.acquirer.acquire(AcquisitionMode::Coarse, tx).await.unwrap();
        assert_eq!(outcome.fix().map(|f| f.fix.accuracy_m), Some(60.0));

        let events = drain(&mut rx);
        assert!(matches!(events.first(), Some(SessionEvent::Rejected(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_passive_feed_and_seed() {
        let mut harness = Harness::new();
        harness.coarse.set_last_known(Some(network(700.0, 120)));
        harness.coarse.push_passive_fix(network(95.0, 10).with_origin("passive"));

        let outcome = harness
            .acquirer
            .acquire(AcquisitionMode::Coarse, NoopObserver)
            .await
            .unwrap();
        let fix = outcome.fix().unwrap();
        assert_eq!(fix.fix.accuracy_m, 95.0);
        assert_eq!(fix.source, SourceLabel::CachedNetwork);
    }

    #[tokio::test(start_paused = true)]
    async fn test_seed_alone_can_converge() {
        let mut harness = Harness::new();
        harness.coarse.set_last_known(Some(network(80.0, 60)));

        let outcome = harness
            .acquirer
            .acquire(AcquisitionMode::Coarse, NoopObserver)
            .await
            .unwrap();
        assert_eq!(outcome.state(), SessionState::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_falls_back_to_default() {
        let mut harness = Harness::new();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let outcome = harness.acquirer.acquire(AcquisitionMode::Coarse, tx).await.unwrap();
        match &outcome {
            SessionOutcome::TimedOut { fix: Some(fix) } => {
                assert!(fix.approximate);
                assert_eq!(fix.provenance, FixProvenance::ApproximateDefault);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        let events = drain(&mut rx);
        let ticks = events
            .iter()
            .filter(|event| matches!(event, SessionEvent::Progress(_)))
            .count();
        assert_eq!(ticks, 15);
        assert!(matches!(events.last(), Some(SessionEvent::TimedOut { .. })));
        assert_eq!(harness.coarse.unsubscribe_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_walks_fallback_chain() {
        let mut harness = Harness::new();
        // Too old to seed, still usable as a fallback
        harness.coarse.set_last_known(Some(network(400.0, 3600)));
        harness.coarse.set_last_passive(Some(network(900.0, 60).with_origin("passive")));

        let handle = harness
            .acquirer
            .start(AcquisitionMode::Coarse, NoopObserver)
            .await
            .unwrap();
        handle.cancel();
        let outcome = harness.acquirer.wait().await.unwrap().unwrap();
        match &outcome {
            SessionOutcome::Cancelled { fix: Some(fix), reason } => {
                assert_eq!(*reason, CancelReason::User);
                assert_eq!(fix.provenance, FixProvenance::LastKnown);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        harness.coarse.set_last_known(None);
        harness.acquirer.start(AcquisitionMode::Coarse, NoopObserver).await.unwrap();
        harness.acquirer.cancel();
        let outcome = harness.acquirer.wait().await.unwrap().unwrap();
        assert_eq!(outcome.fix().map(|f| f.provenance), Some(FixProvenance::PassiveCache));

        harness.coarse.set_last_passive(None);
        harness.acquirer.start(AcquisitionMode::Coarse, NoopObserver).await.unwrap();
        harness.acquirer.cancel();
        let outcome = harness.acquirer.wait().await.unwrap().unwrap();
        assert_eq!(
            outcome.fix().map(|f| f.provenance),
            Some(FixProvenance::ApproximateDefault)
        );

        assert_eq!(harness.coarse.subscribe_count(), 6);
        assert_eq!(harness.coarse.unsubscribe_count(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_mid_session_releases_once() {
        let mut harness = Harness::new();
        harness.coarse.push_fix(network(650.0, 0));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = harness
            .acquirer
            .start(AcquisitionMode::Coarse, tx)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(7_500)).await;
        handle.cancel();
        handle.cancel();

        let outcome = harness.acquirer.wait().await.unwrap().unwrap();
        assert_eq!(outcome.state(), SessionState::Cancelled);
        assert_eq!(outcome.fix().map(|f| f.provenance), Some(FixProvenance::SessionBest));
        assert_eq!(harness.coarse.unsubscribe_count(), 2);

        let events = drain(&mut rx);
        let ticks = events
            .iter()
            .filter(|event| matches!(event, SessionEvent::Progress(_)))
            .count();
        assert_eq!(ticks, 2);
        assert!(matches!(events.last(), Some(SessionEvent::Cancelled { .. })));

        // No ticks after the terminal state
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_permission_denied() {
        let mut harness = Harness::new();
        harness.permissions.set_precise(false);

        let result = harness.acquirer.start(AcquisitionMode::Precise, NoopObserver).await;
        assert!(matches!(
            result,
            Err(AcquisitionError::PermissionDenied { mode: AcquisitionMode::Precise })
        ));
        assert!(!harness.acquirer.is_active());
        assert!(harness.acquirer.current().is_none());
        assert_eq!(harness.precise.subscribe_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_unavailable_cancels_with_fallback() {
        let mut harness = Harness::new();
        harness.coarse.fail_subscriptions(ProviderError::Unavailable {
            provider: "network".to_string(),
            reason: "radio off".to_string(),
        });

        let outcome = harness
            .acquirer
            .acquire(AcquisitionMode::Coarse, NoopObserver)
            .await
            .unwrap();
        match outcome {
            SessionOutcome::Cancelled { fix, reason } => {
                assert_eq!(
                    reason,
                    CancelReason::ProviderUnavailable("Network location not available".to_string())
                );
                assert!(fix.is_some_and(|fix| fix.approximate));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(harness.coarse.unsubscribe_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_session_supersedes_old() {
        let mut harness = Harness::new();
        harness.coarse.push_fix(network(900.0, 0));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let first = harness.acquirer.start(AcquisitionMode::Coarse, tx).await.unwrap();
        assert!(harness.acquirer.is_active());

        harness.precise.push_fix(gps(12.0));
        let second = harness
            .acquirer
            .start(AcquisitionMode::Precise, NoopObserver)
            .await
            .unwrap();
        assert_ne!(first.id(), second.id());
        assert!(first.is_cancelled());

        let events = drain(&mut rx);
        assert!(matches!(
            events.last(),
            Some(SessionEvent::Cancelled { reason: CancelReason::Superseded, .. })
        ));
        assert_eq!(harness.coarse.unsubscribe_count(), 2);

        let outcome = harness.acquirer.wait().await.unwrap().unwrap();
        assert_eq!(outcome.state(), SessionState::Completed);
        assert_eq!(outcome.fix().map(|f| f.source), Some(SourceLabel::Satellite));
    }

    #[tokio::test(start_paused = true)]
    async fn test_precise_timeout_without_default() {
        let mut config = AcquisitionConfig::default();
        config.fallback.approximate_location = None;
        let mut harness = Harness::with_config(config);

        let outcome = harness
            .acquirer
            .acquire(AcquisitionMode::Precise, NoopObserver)
            .await
            .unwrap();
        assert_eq!(outcome, SessionOutcome::TimedOut { fix: None });
        assert_eq!(harness.precise.subscribe_count(), 1);
        assert_eq!(harness.precise.unsubscribe_count(), 1);
        assert_eq!(harness.coarse.subscribe_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_precise_session_best_effort_at_bound() {
        let mut harness = Harness::new();
        harness.precise.push_fix(gps(140.0));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let outcome = harness.acquirer.acquire(AcquisitionMode::Precise, tx).await.unwrap();
        assert_eq!(outcome.state(), SessionState::Completed);
        assert_eq!(outcome.fix().map(|f| f.fix.accuracy_m), Some(140.0));

        let progress: Vec<u8> = drain(&mut rx)
            .into_iter()
            .filter_map(|event| match event {
                SessionEvent::Progress(update) => Some(update.percent),
                _ => None,
            })
            .collect();
        // 5 s ticks up to the 45 s bound
        assert_eq!(progress.len(), 9);
        assert_eq!(progress[0], 30);
        assert_eq!(harness.precise.unsubscribe_count(), 1);
    }
}
