//! Mock provider and permission gate for testing and development

use crate::core::{LocationFix, FEED_CAPACITY};
use crate::provider::{
    CoarseLocationProvider, LocationProvider, PermissionGate, ProviderError, ProviderResult,
    Subscription, SubscriptionId,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;

type ActiveFeed = (SubscriptionId, mpsc::Sender<LocationFix>);

#[derive(Debug, Default)]
struct MockState {
    next_id: u64,
    fresh: Option<ActiveFeed>,
    passive: Option<ActiveFeed>,
    pending_fresh: VecDeque<LocationFix>,
    pending_passive: VecDeque<LocationFix>,
    passive_feed: bool,
    last_known: Option<LocationFix>,
    last_passive: Option<LocationFix>,
    failure: Option<ProviderError>,
    subscribe_calls: u32,
    unsubscribe_calls: u32,
    interval_hints: Vec<Duration>,
}

impl MockState {
    fn open_feed(&mut self, passive: bool) -> (ActiveFeed, mpsc::Receiver<LocationFix>) {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        let queue = if passive {
            &mut self.pending_passive
        } else {
            &mut self.pending_fresh
        };
        while let Some(fix) = queue.pop_front() {
            if let Err(err) = tx.try_send(fix) {
                queue.push_front(err.into_inner());
                break;
            }
        }
        ((id, tx), rx)
    }
}

/// Scripted location provider.
///
/// Readings pushed before a subscription exists are queued and delivered as
/// soon as a session subscribes. Clones share state, so a test can keep one
/// clone for scripting while the session holds another.
#[derive(Debug, Clone)]
pub struct MockLocationProvider {
    name: String,
    state: Arc<Mutex<MockState>>,
}

impl MockLocationProvider {
    /// Create a new mock provider
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Create a mock provider that also offers a passive feed
    pub fn with_passive_feed(name: impl Into<String>) -> Self {
        let provider = Self::new(name);
        provider.state().passive_feed = true;
        provider
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Push a reading into the fresh feed (queued until subscribed)
    pub fn push_fix(&self, fix: LocationFix) {
        let mut state = self.state();
        let undelivered = match &state.fresh {
            Some((_, tx)) => tx.try_send(fix).err().map(|err| err.into_inner()),
            None => Some(fix),
        };
        if let Some(fix) = undelivered {
            state.pending_fresh.push_back(fix);
        }
    }

    /// Push a reading into the passive feed (queued until subscribed)
    pub fn push_passive_fix(&self, fix: LocationFix) {
        let mut state = self.state();
        let undelivered = match &state.passive {
            Some((_, tx)) => tx.try_send(fix).err().map(|err| err.into_inner()),
            None => Some(fix),
        };
        if let Some(fix) = undelivered {
            state.pending_passive.push_back(fix);
        }
    }

    pub fn set_last_known(&self, fix: Option<LocationFix>) {
        self.state().last_known = fix;
    }

    pub fn set_last_passive(&self, fix: Option<LocationFix>) {
        self.state().last_passive = fix;
    }

    /// Make every following subscribe call fail with `error`
    pub fn fail_subscriptions(&self, error: ProviderError) {
        self.state().failure = Some(error);
    }

    /// Number of subscribe calls (fresh and passive)
    pub fn subscribe_count(&self) -> u32 {
        self.state().subscribe_calls
    }

    /// Number of unsubscribe calls, including rejected ones
    pub fn unsubscribe_count(&self) -> u32 {
        self.state().unsubscribe_calls
    }

    /// Whether any feed is still open
    pub fn is_subscribed(&self) -> bool {
        let state = self.state();
        state.fresh.is_some() || state.passive.is_some()
    }

    /// Interval hints passed to subscribe, in call order
    pub fn interval_hints(&self) -> Vec<Duration> {
        self.state().interval_hints.clone()
    }
}

impl LocationProvider for MockLocationProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn subscribe(&self, interval_hint: Duration) -> ProviderResult<Subscription> {
        let mut state = self.state();
        state.subscribe_calls += 1;
        state.interval_hints.push(interval_hint);
        if let Some(error) = &state.failure {
            return Err(error.clone());
        }

        let (active, rx) = state.open_feed(false);
        let id = active.0;
        state.fresh = Some(active);
        Ok(Subscription::new(id, rx))
    }

    fn unsubscribe(&self, id: SubscriptionId) -> ProviderResult<()> {
        let mut state = self.state();
        state.unsubscribe_calls += 1;

        if state.fresh.as_ref().map(|(active, _)| *active) == Some(id) {
            state.fresh = None;
            Ok(())
        } else if state.passive.as_ref().map(|(active, _)| *active) == Some(id) {
            state.passive = None;
            Ok(())
        } else {
            Err(ProviderError::NotSubscribed { id })
        }
    }
}

impl CoarseLocationProvider for MockLocationProvider {
    fn last_known(&self) -> Option<LocationFix> {
        self.state().last_known.clone()
    }

    fn last_passive(&self) -> Option<LocationFix> {
        self.state().last_passive.clone()
    }

    fn subscribe_passive(&self, interval_hint: Duration) -> ProviderResult<Option<Subscription>> {
        let mut state = self.state();
        if !state.passive_feed {
            return Ok(None);
        }
        state.subscribe_calls += 1;
        state.interval_hints.push(interval_hint);
        if let Some(error) = &state.failure {
            return Err(error.clone());
        }

        let (active, rx) = state.open_feed(true);
        let id = active.0;
        state.passive = Some(active);
        Ok(Some(Subscription::new(id, rx)))
    }
}

/// Permission gate with toggleable grants
#[derive(Debug, Default)]
pub struct MockPermissions {
    coarse: AtomicBool,
    precise: AtomicBool,
}

impl MockPermissions {
    pub fn granted() -> Self {
        Self {
            coarse: AtomicBool::new(true),
            precise: AtomicBool::new(true),
        }
    }

    pub fn denied() -> Self {
        Self::default()
    }

    pub fn coarse_only() -> Self {
        Self {
            coarse: AtomicBool::new(true),
            precise: AtomicBool::new(false),
        }
    }

    pub fn set_coarse(&self, granted: bool) {
        self.coarse.store(granted, Ordering::SeqCst);
    }

    pub fn set_precise(&self, granted: bool) {
        self.precise.store(granted, Ordering::SeqCst);
    }
}

impl PermissionGate for MockPermissions {
    fn has_coarse(&self) -> bool {
        self.coarse.load(Ordering::SeqCst)
    }

    fn has_precise(&self) -> bool {
        self.precise.load(Ordering::SeqCst)
    }
}
