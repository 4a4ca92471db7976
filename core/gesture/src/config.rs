//! Gesture configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use hushvault_common::{Error, Result};

/// Identifier of a tappable element on the disguised surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TapTarget(String);

impl TapTarget {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TapTarget {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for TapTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An unlock sequence: targets that must be tapped in this order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapSequence {
    pub name: String,
    pub targets: Vec<TapTarget>,
}

impl TapSequence {
    pub fn new<T: Into<TapTarget>>(
        name: impl Into<String>,
        targets: impl IntoIterator<Item = T>,
    ) -> Self {
        Self {
            name: name.into(),
            targets: targets.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Recognizer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureConfig {
    /// Sequences checked in this order; the first match wins.
    pub sequences: Vec<TapSequence>,

    /// Maximum time between the first and last tap of a sequence.
    pub sequence_timeout: Duration,

    /// Maximum number of taps kept in the buffer.
    pub buffer_capacity: usize,

    /// Failed attempts before the recognizer locks out.
    pub max_failed_attempts: u32,

    /// Lockout duration, and the window over which failures accumulate.
    pub rate_limit_window: Duration,
}

impl GestureConfig {
    pub const DEFAULT_SEQUENCE_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DEFAULT_BUFFER_CAPACITY: usize = 10;
    pub const DEFAULT_MAX_FAILED_ATTEMPTS: u32 = 3;
    pub const DEFAULT_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60 * 60);

    /// Create a configuration with default bounds.
    pub fn new(sequences: Vec<TapSequence>) -> Self {
        Self {
            sequences,
            sequence_timeout: Self::DEFAULT_SEQUENCE_TIMEOUT,
            buffer_capacity: Self::DEFAULT_BUFFER_CAPACITY,
            max_failed_attempts: Self::DEFAULT_MAX_FAILED_ATTEMPTS,
            rate_limit_window: Self::DEFAULT_RATE_LIMIT_WINDOW,
        }
    }

    /// Check the configuration is usable.
    ///
    /// # Errors
    /// Returns `InvalidInput` if there are no sequences, a sequence is empty
    /// or longer than the buffer, or a bound is zero.
    pub fn validate(&self) -> Result<()> {
        if self.sequences.is_empty() {
            return Err(Error::InvalidInput(
                "At least one tap sequence is required".to_string(),
            ));
        }

        for sequence in &self.sequences {
            if sequence.is_empty() {
                return Err(Error::InvalidInput(format!(
                    "Tap sequence '{}' is empty",
                    sequence.name
                )));
            }
            if sequence.len() > self.buffer_capacity {
                return Err(Error::InvalidInput(format!(
                    "Tap sequence '{}' has {} targets but the buffer holds {}",
                    sequence.name,
                    sequence.len(),
                    self.buffer_capacity
                )));
            }
        }

        if self.sequence_timeout.is_zero() || self.rate_limit_window.is_zero() {
            return Err(Error::InvalidInput("Timeouts must be non-zero".to_string()));
        }
        if self.max_failed_attempts == 0 {
            return Err(Error::InvalidInput(
                "max_failed_attempts must be at least 1".to_string(),
            ));
        }
        chrono::Duration::from_std(self.rate_limit_window)
            .map_err(|_| Error::InvalidInput("rate_limit_window is too large".to_string()))?;
        chrono::Duration::from_std(self.sequence_timeout)
            .map_err(|_| Error::InvalidInput("sequence_timeout is too large".to_string()))?;

        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
