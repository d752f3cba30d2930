//! Provider and permission capability traits

use crate::core::LocationFix;
use crate::provider::{ProviderResult, Subscription, SubscriptionId};
use std::time::Duration;

/// A source of pushed location readings
pub trait LocationProvider: Send + Sync {
    /// Provider name used in logs and error messages
    fn name(&self) -> &str;

    /// Start delivering readings at roughly `interval_hint`
    fn subscribe(&self, interval_hint: Duration) -> ProviderResult<Subscription>;

    /// Stop delivering readings for `id`
    fn unsubscribe(&self, id: SubscriptionId) -> ProviderResult<()>;
}

/// Network/cell provider with cached one-shot queries
pub trait CoarseLocationProvider: LocationProvider {
    /// Last fix produced by the coarse provider, if any
    fn last_known(&self) -> Option<LocationFix>;

    /// Last fix held in the passive cache (other consumers' readings)
    fn last_passive(&self) -> Option<LocationFix>;

    /// Feed of passively cached readings.
    /// Returns Ok(None) when the platform offers no passive feed.
    fn subscribe_passive(&self, _interval_hint: Duration) -> ProviderResult<Option<Subscription>> {
        Ok(None)
    }
}

/// Answers whether the user granted location permissions
pub trait PermissionGate: Send + Sync {
    fn has_coarse(&self) -> bool;
    fn has_precise(&self) -> bool;
}
