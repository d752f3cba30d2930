use crate::algorithms::{CoarseLadder, ConvergenceLadder, PreciseLadder};
use crate::core::{
    AcquisitionMode, GeoPoint, APPROXIMATE_ACCURACY_M, APPROXIMATE_LATITUDE,
    APPROXIMATE_LONGITUDE, COARSE_TICK_INTERVAL_MS, PRECISE_TICK_INTERVAL_MS, SEED_MAX_AGE_SECS,
    SESSION_TIMEOUT_SECS,
};
use crate::processing::ClassifierConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Which feeds a session subscribes to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderSet {
    /// The high-power feed only
    PreciseFeed,
    /// The fresh network feed plus optional passive feed and last-known seed
    CoarseFeeds {
        /// Also subscribe to the passive-cache feed
        passive: bool,
        /// Seed the last-known fix when younger than this (seconds); None disables seeding
        seed_max_age_secs: Option<u64>,
    },
}

impl ProviderSet {
    pub fn mode(&self) -> AcquisitionMode {
        match self {
            ProviderSet::PreciseFeed => AcquisitionMode::Precise,
            ProviderSet::CoarseFeeds { .. } => AcquisitionMode::Coarse,
        }
    }
}

/// Per-mode acquisition policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModePolicy {
    pub providers: ProviderSet,
    pub ladder: ConvergenceLadder,
    /// Scheduler tick period (milliseconds)
    pub tick_interval_ms: u64,
    /// Delivery interval requested from providers (milliseconds)
    pub interval_hint_ms: u64,
    /// Session time bound (seconds); None runs until convergence or cancel
    pub timeout_secs: Option<u64>,
}

impl ModePolicy {
    pub fn coarse() -> Self {
        Self {
            providers: ProviderSet::CoarseFeeds {
                passive: true,
                seed_max_age_secs: Some(SEED_MAX_AGE_SECS),
            },
            ladder: ConvergenceLadder::Coarse(CoarseLadder::default()),
            tick_interval_ms: COARSE_TICK_INTERVAL_MS,
            interval_hint_ms: COARSE_TICK_INTERVAL_MS,
            timeout_secs: Some(SESSION_TIMEOUT_SECS),
        }
    }

    pub fn precise() -> Self {
        Self {
            providers: ProviderSet::PreciseFeed,
            ladder: ConvergenceLadder::Precise(PreciseLadder::default()),
            tick_interval_ms: PRECISE_TICK_INTERVAL_MS,
            interval_hint_ms: PRECISE_TICK_INTERVAL_MS,
            timeout_secs: Some(SESSION_TIMEOUT_SECS),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn interval_hint(&self) -> Duration {
        Duration::from_millis(self.interval_hint_ms)
    }
}

/// Last-resort location settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Approximate default; None disables the final fallback step
    pub approximate_location: Option<GeoPoint>,
    /// Accuracy reported with the approximate default (meters)
    pub approximate_accuracy_m: f32,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            approximate_location: Some(GeoPoint {
                latitude: APPROXIMATE_LATITUDE,
                longitude: APPROXIMATE_LONGITUDE,
            }),
            approximate_accuracy_m: APPROXIMATE_ACCURACY_M,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    pub classifier: ClassifierConfig,
    pub coarse: ModePolicy,
    pub precise: ModePolicy,
    pub fallback: FallbackConfig,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierConfig::default(),
            coarse: ModePolicy::coarse(),
            precise: ModePolicy::precise(),
            fallback: FallbackConfig::default(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid parameter {parameter} = {value}: {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },

    #[error("config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn invalid(parameter: &str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::InvalidParameter {
        parameter: parameter.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

impl AcquisitionConfig {
    /// Load and validate a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let config: AcquisitionConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn policy(&self, mode: AcquisitionMode) -> &ModePolicy {
        match mode {
            AcquisitionMode::Coarse => &self.coarse,
            AcquisitionMode::Precise => &self.precise,
        }
    }

    /// Check every parameter, returning the first problem found
    pub fn validate(&self) -> Result<(), ConfigError> {
        let classifier = &self.classifier;
        if !(classifier.heuristic_max_accuracy_m.is_finite() && classifier.heuristic_max_accuracy_m > 0.0) {
            return Err(invalid(
                "classifier.heuristic_max_accuracy_m",
                classifier.heuristic_max_accuracy_m,
                "must be a positive number of meters",
            ));
        }

        Self::validate_policy("coarse", AcquisitionMode::Coarse, &self.coarse)?;
        Self::validate_policy("precise", AcquisitionMode::Precise, &self.precise)?;

        if let Some(point) = &self.fallback.approximate_location {
            if !point.is_valid() {
                return Err(invalid(
                    "fallback.approximate_location",
                    format!("({}, {})", point.latitude, point.longitude),
                    "coordinates out of range",
                ));
            }
        }

        let accuracy = self.fallback.approximate_accuracy_m;
        if !(accuracy.is_finite() && accuracy > 0.0) {
            return Err(invalid(
                "fallback.approximate_accuracy_m",
                accuracy,
                "must be a positive number of meters",
            ));
        }

        Ok(())
    }

    fn validate_policy(slot: &str, mode: AcquisitionMode, policy: &ModePolicy) -> Result<(), ConfigError> {
        if policy.providers.mode() != mode {
            return Err(invalid(
                &format!("{}.providers", slot),
                policy.providers.mode(),
                "provider set belongs to the other mode",
            ));
        }

        let ladder_mode = match policy.ladder {
            ConvergenceLadder::Coarse(_) => AcquisitionMode::Coarse,
            ConvergenceLadder::Precise(_) => AcquisitionMode::Precise,
        };
        if ladder_mode != mode {
            return Err(invalid(
                &format!("{}.ladder", slot),
                ladder_mode,
                "ladder belongs to the other mode",
            ));
        }

        if policy.ladder.is_empty() {
            return Err(invalid(&format!("{}.ladder", slot), "[]", "ladder has no steps"));
        }

        if let ConvergenceLadder::Coarse(ladder) = &policy.ladder {
            if ladder.progress_horizon_secs == 0 {
                return Err(invalid(
                    &format!("{}.ladder.progress_horizon_secs", slot),
                    0,
                    "must be at least one second",
                ));
            }
        }

        if policy.tick_interval_ms == 0 {
            return Err(invalid(
                &format!("{}.tick_interval_ms", slot),
                0,
                "tick interval must be non-zero",
            ));
        }

        if policy.timeout_secs == Some(0) {
            return Err(invalid(
                &format!("{}.timeout_secs", slot),
                0,
                "use null to disable the timeout",
            ));
        }

        Ok(())
    }

    /// Replace the tick interval of one mode, returning the old value
    pub fn set_tick_interval(&mut self, mode: AcquisitionMode, interval_ms: u64) -> Result<u64, ConfigError> {
        if interval_ms == 0 {
            return Err(invalid("tick_interval_ms", 0, "tick interval must be non-zero"));
        }

        let policy = match mode {
            AcquisitionMode::Coarse => &mut self.coarse,
            AcquisitionMode::Precise => &mut self.precise,
        };
        Ok(std::mem::replace(&mut policy.tick_interval_ms, interval_ms))
    }
}
