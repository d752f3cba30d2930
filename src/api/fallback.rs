//! Best-effort fix resolution for sessions that end without converging
//!
//! Order: the session's own best, the coarse provider's last-known fix, the
//! passive cache, then the configured approximate default. Cached fixes are
//! only consulted with a coarse grant and only when they classify as coarse.

use crate::api::types::{FixProvenance, ResolvedFix};
use crate::core::{FixOrigin, LocationFix};
use crate::processing::SourceClassifier;
use crate::provider::{CoarseLocationProvider, PermissionGate};
use crate::utils::FallbackConfig;
use tracing::debug;

pub struct FallbackChain<'a> {
    coarse: &'a dyn CoarseLocationProvider,
    permissions: &'a dyn PermissionGate,
    classifier: &'a SourceClassifier,
    config: &'a FallbackConfig,
}

impl<'a> FallbackChain<'a> {
    pub fn new(
        coarse: &'a dyn CoarseLocationProvider,
        permissions: &'a dyn PermissionGate,
        classifier: &'a SourceClassifier,
        config: &'a FallbackConfig,
    ) -> Self {
        Self {
            coarse,
            permissions,
            classifier,
            config,
        }
    }

    /// Resolve the first available fix; None only when the default is disabled
    pub fn resolve(&self, session_best: Option<LocationFix>, now_ms: u64) -> Option<ResolvedFix> {
        if let Some(fix) = session_best {
            debug!(accuracy_m = fix.accuracy_m, "fallback: session best");
            return Some(ResolvedFix::from_reading(fix, FixProvenance::SessionBest));
        }

        if self.permissions.has_coarse() {
            if let Some(fix) = self.usable(self.coarse.last_known(), now_ms) {
                debug!(accuracy_m = fix.accuracy_m, age_ms = fix.age_ms(now_ms), "fallback: last known");
                return Some(ResolvedFix::from_reading(fix, FixProvenance::LastKnown));
            }

            if let Some(fix) = self.usable(self.coarse.last_passive(), now_ms) {
                debug!(accuracy_m = fix.accuracy_m, age_ms = fix.age_ms(now_ms), "fallback: passive cache");
                return Some(ResolvedFix::from_reading(fix, FixProvenance::PassiveCache));
            }
        }

        let point = self.config.approximate_location?;
        debug!(
            latitude = point.latitude,
            longitude = point.longitude,
            "fallback: approximate default"
        );
        Some(ResolvedFix::approximate(point, self.config.approximate_accuracy_m, now_ms))
    }

    fn usable(&self, fix: Option<LocationFix>, now_ms: u64) -> Option<LocationFix> {
        fix.filter(|fix| self.classifier.classify(fix, now_ms) == FixOrigin::Coarse)
    }
}
