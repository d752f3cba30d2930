//! Provider error types

use crate::provider::SubscriptionId;
use thiserror::Error;

/// Errors reported by location providers
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// Provider could not start delivering readings
    #[error("provider {provider} unavailable: {reason}")]
    Unavailable { provider: String, reason: String },
    /// Unsubscribe with a handle the provider does not know
    #[error("no active subscription {id}")]
    NotSubscribed { id: SubscriptionId },
    /// Provider switched off by the platform or user
    #[error("provider {provider} is disabled")]
    Disabled { provider: String },
}

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

impl ProviderError {
    /// Message suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            ProviderError::Unavailable { .. } => "Network location not available".to_string(),
            ProviderError::Disabled { .. } => "Location provider disabled".to_string(),
            ProviderError::NotSubscribed { .. } => self.to_string(),
        }
    }
}
