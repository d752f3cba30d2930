//! Configuration

pub mod config;

pub use config::{AcquisitionConfig, ConfigError, FallbackConfig, ModePolicy, ProviderSet};
