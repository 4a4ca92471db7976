//! Biometric prompt seam.
//!
//! The platform owns the sensor and the prompt UI. The vault only sees the
//! outcome of a prompt.

use async_trait::async_trait;

use hushvault_common::{Error, Result};

/// What the user sees when the prompt is shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    pub title: String,
    pub subtitle: Option<String>,
    /// Key the authentication will unlock.
    pub key_alias: String,
}

impl PromptRequest {
    pub fn new(title: impl Into<String>, key_alias: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: None,
            key_alias: key_alias.into(),
        }
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }
}

/// Result of one biometric prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BiometricOutcome {
    Authenticated,
    /// The sensor read did not match.
    Failed,
    /// The user dismissed the prompt.
    Cancelled,
    /// No sensor, no enrolled biometrics, or the hardware is locked out.
    Unavailable(String),
}

impl BiometricOutcome {
    /// Map the outcome onto the vault error taxonomy.
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Authenticated => Ok(()),
            Self::Failed => Err(Error::BiometricFailed),
            Self::Cancelled => Err(Error::BiometricCancelled),
            Self::Unavailable(reason) => Err(Error::BiometricUnavailable(reason)),
        }
    }
}

/// Shows a biometric prompt and reports the outcome.
#[async_trait]
pub trait BiometricPrompt: Send + Sync {
    async fn authenticate(&self, request: &PromptRequest) -> BiometricOutcome;
}
