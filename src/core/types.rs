//! Core data types for location acquisition

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single reported position with accuracy and timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Horizontal accuracy radius (meters)
    pub accuracy_m: f32,
    /// Reading time (milliseconds since Unix epoch)
    pub timestamp_ms: u64,
    /// Provider-supplied label ("gps", "network", "passive", ...)
    pub origin_tag: Option<String>,
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64, accuracy_m: f32, timestamp_ms: u64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_m,
            timestamp_ms,
            origin_tag: None,
        }
    }

    pub fn with_origin(mut self, tag: impl Into<String>) -> Self {
        self.origin_tag = Some(tag.into());
        self
    }

    /// Age of the reading relative to `now_ms`; future timestamps count as zero
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.timestamp_ms)
    }

    /// Origin tag lowercased for comparisons
    pub fn normalized_tag(&self) -> Option<String> {
        self.origin_tag.as_deref().map(str::to_ascii_lowercase)
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Plain coordinate pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Where a reading came from, as far as the classifier can tell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FixOrigin {
    /// Dedicated positioning hardware (GNSS)
    Precise,
    /// Network, cell, WiFi or cached positioning
    Coarse,
}

/// Operating mode of an acquisition session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AcquisitionMode {
    /// High-power precise feed
    Precise,
    /// Low-power network feeds with candidate arbitration
    Coarse,
}

impl fmt::Display for AcquisitionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Precise => write!(f, "precise"),
            Self::Coarse => write!(f, "coarse"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fix_age_saturates() {
        let fix = LocationFix::new(1.0, 2.0, 50.0, 10_000);
        assert_eq!(fix.age_ms(15_000), 5_000);
        assert_eq!(fix.age_ms(5_000), 0);
    }

    #[test]
    fn test_normalized_tag() {
        let fix = LocationFix::new(0.0, 0.0, 10.0, 0).with_origin("GPS");
        assert_eq!(fix.normalized_tag().as_deref(), Some("gps"));
        assert_eq!(LocationFix::new(0.0, 0.0, 10.0, 0).normalized_tag(), None);
    }

    #[test]
    fn test_geo_point_validation() {
        assert!(GeoPoint { latitude: 40.7128, longitude: -74.0060 }.is_valid());
        assert!(!GeoPoint { latitude: 91.0, longitude: 0.0 }.is_valid());
        assert!(!GeoPoint { latitude: f64::NAN, longitude: 0.0 }.is_valid());
    }

    #[test]
    fn test_fix_serialization() {
        let fix = LocationFix::new(47.6, -122.3, 120.0, 1_700_000_000_000).with_origin("network");
        let json = serde_json::to_string(&fix).unwrap();
        let back: LocationFix = serde_json::from_str(&json).unwrap();
        assert_eq!(fix, back);
    }
}
