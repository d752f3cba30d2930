//! Origin classification and source labelling of location fixes
//!
//! Provider tags are trusted first. Coarse-tagged (or untagged) fixes that are
//! both very accurate and very recent are treated as precise. Some network
//! providers are silently backed by GNSS hardware, and this heuristic catches
//! most of them. It can also misfile an unusually good network fix, so it is a
//! heuristic and not a guarantee.

use crate::core::{
    FixOrigin, LocationFix, COARSE_PROVIDER_TAGS, HEURISTIC_MAX_ACCURACY_M, HEURISTIC_MAX_AGE_SECS,
    PRECISE_PROVIDER_TAGS,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classifier thresholds and tag sets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Tags that always classify as precise
    pub precise_tags: Vec<String>,
    /// Tags subject to the accuracy/recency heuristic (untagged fixes are too)
    pub coarse_tags: Vec<String>,
    /// Heuristic accuracy bound (meters, exclusive)
    pub heuristic_max_accuracy_m: f32,
    /// Heuristic recency bound (seconds, exclusive)
    pub heuristic_max_age_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            precise_tags: PRECISE_PROVIDER_TAGS.iter().map(|t| t.to_string()).collect(),
            coarse_tags: COARSE_PROVIDER_TAGS.iter().map(|t| t.to_string()).collect(),
            heuristic_max_accuracy_m: HEURISTIC_MAX_ACCURACY_M,
            heuristic_max_age_secs: HEURISTIC_MAX_AGE_SECS,
        }
    }
}

/// Labels fixes as precise- or coarse-origin
#[derive(Debug, Clone, Default)]
pub struct SourceClassifier {
    config: ClassifierConfig,
}

impl SourceClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify `fix` as seen at `now_ms`
    pub fn classify(&self, fix: &LocationFix, now_ms: u64) -> FixOrigin {
        let tag = fix.normalized_tag();

        match tag.as_deref() {
            Some(tag) if Self::contains(&self.config.precise_tags, tag) => FixOrigin::Precise,
            Some(tag) if !Self::contains(&self.config.coarse_tags, tag) => FixOrigin::Coarse,
            _ => {
                if self.looks_like_gnss(fix, now_ms) {
                    FixOrigin::Precise
                } else {
                    FixOrigin::Coarse
                }
            }
        }
    }

    fn looks_like_gnss(&self, fix: &LocationFix, now_ms: u64) -> bool {
        let max_age_ms = self.config.heuristic_max_age_secs.saturating_mul(1000);
        fix.accuracy_m < self.config.heuristic_max_accuracy_m && fix.age_ms(now_ms) < max_age_ms
    }

    fn contains(tags: &[String], tag: &str) -> bool {
        tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

/// Human-readable provenance shown alongside a fix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceLabel {
    Satellite,
    CellTowerWifi,
    CachedNetwork,
    NetworkServices,
    NetworkProvider,
    IpGeolocation,
    CellTower,
    WifiNetwork,
    Approximate,
}

impl SourceLabel {
    /// Derive the label from the origin tag, or from accuracy when untagged
    pub fn for_fix(fix: &LocationFix) -> Self {
        match fix.normalized_tag().as_deref() {
            Some("gps") | Some("precise") => SourceLabel::Satellite,
            Some("network") => SourceLabel::CellTowerWifi,
            Some("passive") | Some("cached") => SourceLabel::CachedNetwork,
            Some("fused") => SourceLabel::NetworkServices,
            Some(_) => SourceLabel::NetworkProvider,
            None if fix.accuracy_m > 1000.0 => SourceLabel::IpGeolocation,
            None if fix.accuracy_m > 100.0 => SourceLabel::CellTower,
            None => SourceLabel::WifiNetwork,
        }
    }
}

impl fmt::Display for SourceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SourceLabel::Satellite => "GPS/GNSS",
            SourceLabel::CellTowerWifi => "Cell Tower/WiFi",
            SourceLabel::CachedNetwork => "Cached Network",
            SourceLabel::NetworkServices => "Network Services",
            SourceLabel::NetworkProvider => "Network Provider",
            SourceLabel::IpGeolocation => "IP Geolocation",
            SourceLabel::CellTower => "Cell Tower",
            SourceLabel::WifiNetwork => "WiFi Network",
            SourceLabel::Approximate => "Approximate Location",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000_000;

    fn fix(accuracy_m: f32, age_ms: u64, tag: Option<&str>) -> LocationFix {
        let mut fix = LocationFix::new(51.5, -0.12, accuracy_m, NOW - age_ms);
        fix.origin_tag = tag.map(str::to_string);
        fix
    }

    #[test]
    fn test_precise_tag_always_precise() {
        let classifier = SourceClassifier::default();
        for (accuracy, age) in [(5.0, 0), (900.0, 0), (5.0, 3_600_000), (5_000.0, 86_400_000)] {
            assert_eq!(classifier.classify(&fix(accuracy, age, Some("precise")), NOW), FixOrigin::Precise);
            assert_eq!(classifier.classify(&fix(accuracy, age, Some("gps")), NOW), FixOrigin::Precise);
        }
        assert_eq!(classifier.classify(&fix(500.0, 0, Some("GPS")), NOW), FixOrigin::Precise);
    }

    #[test]
    fn test_heuristic_reclassifies_accurate_recent_fixes() {
        let classifier = SourceClassifier::default();
        for tag in [None, Some("network"), Some("passive"), Some("fused")] {
            assert_eq!(classifier.classify(&fix(19.9, 29_999, tag), NOW), FixOrigin::Precise);
            assert_eq!(classifier.classify(&fix(5.0, 0, tag), NOW), FixOrigin::Precise);
        }
    }

    #[test]
    fn test_heuristic_bounds_are_exclusive() {
        let classifier = SourceClassifier::default();
        assert_eq!(classifier.classify(&fix(20.0, 0, Some("network")), NOW), FixOrigin::Coarse);
        assert_eq!(classifier.classify(&fix(10.0, 30_000, Some("network")), NOW), FixOrigin::Coarse);
        assert_eq!(classifier.classify(&fix(150.0, 0, None), NOW), FixOrigin::Coarse);
    }

    #[test]
    fn test_unknown_tag_skips_heuristic() {
        let classifier = SourceClassifier::default();
        assert_eq!(classifier.classify(&fix(5.0, 0, Some("cached")), NOW), FixOrigin::Coarse);
    }

    #[test]
    fn test_future_timestamp_counts_as_recent() {
        let classifier = SourceClassifier::default();
        let mut future = fix(10.0, 0, Some("network"));
        future.timestamp_ms = NOW + 5_000;
        assert_eq!(classifier.classify(&future, NOW), FixOrigin::Precise);
    }

    #[test]
    fn test_custom_thresholds() {
        let classifier = SourceClassifier::new(ClassifierConfig {
            heuristic_max_accuracy_m: 50.0,
            heuristic_max_age_secs: 5,
            ..ClassifierConfig::default()
        });
        assert_eq!(classifier.classify(&fix(40.0, 1_000, None), NOW), FixOrigin::Precise);
        assert_eq!(classifier.classify(&fix(40.0, 6_000, None), NOW), FixOrigin::Coarse);
    }

    #[test]
    fn test_source_labels() {
        assert_eq!(SourceLabel::for_fix(&fix(10.0, 0, Some("gps"))), SourceLabel::Satellite);
        assert_eq!(SourceLabel::for_fix(&fix(10.0, 0, Some("Network"))), SourceLabel::CellTowerWifi);
        assert_eq!(SourceLabel::for_fix(&fix(10.0, 0, Some("passive"))), SourceLabel::CachedNetwork);
        assert_eq!(SourceLabel::for_fix(&fix(10.0, 0, Some("fused"))), SourceLabel::NetworkServices);
        assert_eq!(SourceLabel::for_fix(&fix(10.0, 0, Some("beacon"))), SourceLabel::NetworkProvider);
        assert_eq!(SourceLabel::for_fix(&fix(1500.0, 0, None)), SourceLabel::IpGeolocation);
        assert_eq!(SourceLabel::for_fix(&fix(400.0, 0, None)), SourceLabel::CellTower);
        assert_eq!(SourceLabel::for_fix(&fix(100.0, 0, None)), SourceLabel::WifiNetwork);
        assert_eq!(SourceLabel::CellTowerWifi.to_string(), "Cell Tower/WiFi");
    }
}
