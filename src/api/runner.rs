//! Async session runner
//!
//! One tokio task per session. The task owns the session, the provider feeds
//! and the tick timer, so readings and ticks are handled strictly one after
//! another. Every exit path releases the subscriptions and drops the timer
//! before the outcome is reported.

use crate::api::acquirer::SessionDeps;
use crate::api::callback::SessionObserver;
use crate::api::fallback::FallbackChain;
use crate::api::session::{AcquisitionSession, ReadingDisposition, TickOutcome};
use crate::api::types::{AcquisitionError, CancelReason, ProgressUpdate, ResolvedFix, SessionOutcome};
use crate::core::LocationFix;
use crate::processing::SourceClassifier;
use crate::provider::{FixStream, SubscriptionId};
use crate::utils::{FallbackConfig, ModePolicy, ProviderSet};
use std::sync::{Arc, OnceLock};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

/// Which provider issued a subscription
#[derive(Debug, Clone, Copy)]
enum Issuer {
    Precise,
    Coarse,
}

#[derive(Debug)]
struct Lease {
    issuer: Issuer,
    id: SubscriptionId,
}

#[derive(Debug, Clone, Copy)]
enum Feed {
    Fresh,
    Passive,
}

enum LoopEvent {
    Cancelled,
    Reading(Feed, LocationFix),
    Closed(Feed),
    Tick,
}

/// How the select loop ended
enum Exit {
    Completed(ProgressUpdate, ResolvedFix),
    TimedOut(ProgressUpdate),
    Cancelled(CancelReason),
}

pub(crate) struct SessionRunner {
    session: AcquisitionSession,
    policy: ModePolicy,
    deps: SessionDeps,
    classifier: SourceClassifier,
    fallback: FallbackConfig,
    observer: Box<dyn SessionObserver>,
    cancel: CancellationToken,
    cancel_reason: Arc<OnceLock<CancelReason>>,
    leases: Vec<Lease>,
}

async fn next_fix(feed: &mut Option<FixStream>) -> Option<LocationFix> {
    match feed {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

impl SessionRunner {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        session: AcquisitionSession,
        policy: ModePolicy,
        deps: SessionDeps,
        classifier: SourceClassifier,
        fallback: FallbackConfig,
        observer: Box<dyn SessionObserver>,
        cancel: CancellationToken,
        cancel_reason: Arc<OnceLock<CancelReason>>,
    ) -> Self {
        Self {
            session,
            policy,
            deps,
            classifier,
            fallback,
            observer,
            cancel,
            cancel_reason,
            leases: Vec::new(),
        }
    }

    pub(crate) async fn run(self) -> SessionOutcome {
        let span = info_span!(
            "session",
            session_id = %self.session.id(),
            mode = %self.session.mode()
        );
        self.drive().instrument(span).await
    }

    async fn drive(mut self) -> SessionOutcome {
        info!(
            tick_ms = self.policy.tick_interval_ms,
            timeout_secs = ?self.policy.timeout_secs,
            "acquisition started"
        );

        let exit = match self.open_feeds() {
            Ok((fresh, passive)) => self.pump(fresh, passive).await,
            Err(error) => {
                warn!(%error, "required feed unavailable");
                let message = match &error {
                    AcquisitionError::ProviderUnavailable { source, .. } => source.user_message(),
                    other => other.to_string(),
                };
                Exit::Cancelled(CancelReason::ProviderUnavailable(message))
            }
        };

        self.release();
        self.finish(exit)
    }

    /// Subscribe to the mode's feeds and seed the last-known fix
    fn open_feeds(&mut self) -> Result<(Option<FixStream>, Option<FixStream>), AcquisitionError> {
        let hint = self.policy.interval_hint();

        match self.policy.providers.clone() {
            ProviderSet::PreciseFeed => {
                let provider = &self.deps.precise;
                let subscription = provider.subscribe(hint).map_err(|source| {
                    AcquisitionError::ProviderUnavailable {
                        provider: provider.name().to_string(),
                        source,
                    }
                })?;
                debug!(subscription = %subscription.id, provider = provider.name(), "subscribed");
                self.leases.push(Lease {
                    issuer: Issuer::Precise,
                    id: subscription.id,
                });
                Ok((Some(subscription.feed), None))
            }
            ProviderSet::CoarseFeeds {
                passive,
                seed_max_age_secs,
            } => {
                let provider = Arc::clone(&self.deps.coarse);
                let subscription = provider.subscribe(hint).map_err(|source| {
                    AcquisitionError::ProviderUnavailable {
                        provider: provider.name().to_string(),
                        source,
                    }
                })?;
                debug!(subscription = %subscription.id, provider = provider.name(), "subscribed");
                self.leases.push(Lease {
                    issuer: Issuer::Coarse,
                    id: subscription.id,
                });

                let passive_feed = if passive {
                    match provider.subscribe_passive(hint) {
                        Ok(Some(passive)) => {
                            debug!(subscription = %passive.id, "subscribed to passive feed");
                            self.leases.push(Lease {
                                issuer: Issuer::Coarse,
                                id: passive.id,
                            });
                            Some(passive.feed)
                        }
                        Ok(None) => None,
                        Err(error) => {
                            warn!(%error, "passive feed unavailable, continuing without it");
                            None
                        }
                    }
                } else {
                    None
                };

                if let (Some(max_age_secs), Some(fix)) = (seed_max_age_secs, provider.last_known()) {
                    let now_ms = self.deps.clock.now_ms();
                    let accuracy_m = fix.accuracy_m;
                    if self.session.seed(fix, now_ms, max_age_secs) {
                        debug!(accuracy_m, "seeded last known fix");
                    }
                }

                Ok((Some(subscription.feed), passive_feed))
            }
        }
    }

    async fn pump(&mut self, mut fresh: Option<FixStream>, mut passive: Option<FixStream>) -> Exit {
        let period = self.policy.tick_interval();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let cancel = self.cancel.clone();

        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => LoopEvent::Cancelled,
                fix = next_fix(&mut fresh) => match fix {
                    Some(fix) => LoopEvent::Reading(Feed::Fresh, fix),
                    None => LoopEvent::Closed(Feed::Fresh),
                },
                fix = next_fix(&mut passive) => match fix {
                    Some(fix) => LoopEvent::Reading(Feed::Passive, fix),
                    None => LoopEvent::Closed(Feed::Passive),
                },
                _ = ticker.tick() => LoopEvent::Tick,
            };

            match event {
                LoopEvent::Cancelled => {
                    let reason = self.cancel_reason.get().cloned().unwrap_or(CancelReason::User);
                    return Exit::Cancelled(reason);
                }
                LoopEvent::Reading(feed, fix) => self.on_reading(feed, fix),
                LoopEvent::Closed(feed) => {
                    debug!(?feed, "feed closed");
                    match feed {
                        Feed::Fresh => fresh = None,
                        Feed::Passive => passive = None,
                    }
                }
                LoopEvent::Tick => match self.session.on_tick() {
                    TickOutcome::Continue(update) => {
                        debug!(percent = update.percent, elapsed_secs = update.elapsed_secs, "tick");
                        self.observer.on_progress(update);
                    }
                    TickOutcome::Completed(update, fix) => return Exit::Completed(update, fix),
                    TickOutcome::TimedOut(update) => return Exit::TimedOut(update),
                    TickOutcome::Ignored => {}
                },
            }
        }
    }

    fn on_reading(&mut self, feed: Feed, fix: LocationFix) {
        let now_ms = self.deps.clock.now_ms();
        let accuracy_m = fix.accuracy_m;

        match self.session.on_reading(fix, now_ms) {
            ReadingDisposition::Accepted => {
                debug!(?feed, accuracy_m, candidates = self.session.candidates().len(), "reading accepted");
            }
            ReadingDisposition::Rejected(reason) => {
                warn!(?feed, accuracy_m, %reason, "reading rejected");
                self.observer.on_rejected_reading(reason);
            }
            ReadingDisposition::Ignored => {}
        }
    }

    /// Unsubscribe every lease once; failures are logged and ignored
    fn release(&mut self) {
        for lease in self.leases.drain(..) {
            let result = match lease.issuer {
                Issuer::Precise => self.deps.precise.unsubscribe(lease.id),
                Issuer::Coarse => self.deps.coarse.unsubscribe(lease.id),
            };
            match result {
                Ok(()) => debug!(subscription = %lease.id, "unsubscribed"),
                Err(error) => warn!(subscription = %lease.id, %error, "unsubscribe failed"),
            }
        }
    }

    fn finish(mut self, exit: Exit) -> SessionOutcome {
        let outcome = match exit {
            Exit::Completed(update, fix) => {
                self.observer.on_progress(update);
                SessionOutcome::Completed(fix)
            }
            Exit::TimedOut(update) => {
                self.observer.on_progress(update);
                SessionOutcome::TimedOut {
                    fix: self.resolve_fallback(),
                }
            }
            Exit::Cancelled(reason) => {
                self.session.cancel();
                SessionOutcome::Cancelled {
                    fix: self.resolve_fallback(),
                    reason,
                }
            }
        };

        match &outcome {
            SessionOutcome::Completed(fix) => {
                info!(source = %fix.source, accuracy_m = fix.fix.accuracy_m, "acquisition completed");
                self.observer.on_completed(fix.clone());
            }
            SessionOutcome::Cancelled { fix, reason } => {
                info!(%reason, fallback = ?fix.as_ref().map(|f| f.provenance), "acquisition cancelled");
                self.observer.on_cancelled(fix.clone(), reason.clone());
            }
            SessionOutcome::TimedOut { fix } => {
                info!(fallback = ?fix.as_ref().map(|f| f.provenance), "acquisition timed out");
                self.observer.on_timed_out(fix.clone());
            }
        }

        outcome
    }

    fn resolve_fallback(&self) -> Option<ResolvedFix> {
        let chain = FallbackChain::new(
            self.deps.coarse.as_ref(),
            self.deps.permissions.as_ref(),
            &self.classifier,
            &self.fallback,
        );
        chain.resolve(self.session.current_best(), self.deps.clock.now_ms())
    }
}
