//! Provider abstraction layer
//!
//! Location providers push readings into bounded channels. A session owns the
//! receiving end and hands the handle back through `unsubscribe` on teardown.

pub mod interface;
pub mod mock;
pub mod error;

pub use interface::{CoarseLocationProvider, LocationProvider, PermissionGate};
pub use mock::{MockLocationProvider, MockPermissions};
pub use error::{ProviderError, ProviderResult};

use crate::core::LocationFix;
use std::fmt;
use tokio::sync::mpsc;

/// Receiving side of a provider feed
pub type FixStream = mpsc::Receiver<LocationFix>;

/// Identifies one subscription on one provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An active provider feed
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub feed: FixStream,
}

impl Subscription {
    pub fn new(id: SubscriptionId, feed: FixStream) -> Self {
        Self { id, feed }
    }
}
