//! Default thresholds and intervals

/// Provider tags that always mean dedicated positioning hardware
pub const PRECISE_PROVIDER_TAGS: &[&str] = &["gps", "precise"];

/// Provider tags subject to the high-accuracy heuristic
pub const COARSE_PROVIDER_TAGS: &[&str] = &["network", "passive", "fused"];

/// Coarse-tagged fixes better than this are treated as precise when recent (meters)
pub const HEURISTIC_MAX_ACCURACY_M: f32 = 20.0;

/// Recency window for the high-accuracy heuristic (seconds)
pub const HEURISTIC_MAX_AGE_SECS: u64 = 30;

/// Coarse-mode evaluation interval (milliseconds)
pub const COARSE_TICK_INTERVAL_MS: u64 = 3_000;

/// Precise-mode evaluation interval (milliseconds)
pub const PRECISE_TICK_INTERVAL_MS: u64 = 5_000;

/// Session bound shared by both modes (seconds)
pub const SESSION_TIMEOUT_SECS: u64 = 45;

/// Last-known fixes older than this are not seeded as candidates (seconds)
pub const SEED_MAX_AGE_SECS: u64 = 300;

/// Approximate default location (New York City)
pub const APPROXIMATE_LATITUDE: f64 = 40.7128;
pub const APPROXIMATE_LONGITUDE: f64 = -74.0060;

/// Accuracy reported for the approximate default (meters)
pub const APPROXIMATE_ACCURACY_M: f32 = 5_000.0;

/// Buffered readings per provider feed
pub const FEED_CAPACITY: usize = 32;
