//! Key store capability trait.
//!
//! A key store keeps named symmetric keys and small named secrets. On
//! devices with a secure enclave the implementation wraps the platform
//! keystore; [`crate::SoftwareKeyStore`] is the in-process fallback.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use hushvault_common::{Result, SensitiveBytes};
use hushvault_crypto::VaultKey;

/// Usage restrictions attached to a key when it is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct KeyPolicy {
    /// Every use needs the user to authenticate.
    pub require_user_auth: bool,
    /// On platforms that cannot enforce per-operation authentication, how
    /// long one successful authentication keeps the key usable.
    pub auth_validity: Option<Duration>,
}

impl KeyPolicy {
    /// A key usable without user interaction.
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// A key gated behind user authentication.
    pub fn user_auth(validity: Duration) -> Self {
        Self {
            require_user_auth: true,
            auth_validity: Some(validity),
        }
    }
}

/// Storage for named keys and secrets.
///
/// Implementations must be safe to share between threads. Deleting an alias
/// that does not exist is not an error.
pub trait KeyStore: Send + Sync {
    /// Name of the backend (e.g., "software", "android-keystore").
    fn name(&self) -> &str;

    /// Whether keys live in isolated hardware.
    fn is_hardware_backed(&self) -> bool;

    /// Whether the backend can demand authentication for every single use
    /// of a key, rather than for a validity window.
    fn supports_per_operation_auth(&self) -> bool;

    /// Generate a fresh random key under `alias`, replacing any existing one.
    fn generate_key(&self, alias: &str, policy: KeyPolicy) -> Result<()>;

    /// Fetch a key.
    ///
    /// Returns `Ok(None)` if no key exists under `alias`.
    fn get_key(&self, alias: &str) -> Result<Option<VaultKey>>;

    /// Policy a key was generated with.
    fn key_policy(&self, alias: &str) -> Result<Option<KeyPolicy>>;

    /// Check whether a key exists.
    fn contains_key(&self, alias: &str) -> Result<bool>;

    /// Destroy a key.
    fn delete_key(&self, alias: &str) -> Result<()>;

    /// Persist a small secret blob, replacing any existing one.
    fn put_secret(&self, alias: &str, data: &[u8]) -> Result<()>;

    /// Fetch a secret blob.
    fn get_secret(&self, alias: &str) -> Result<Option<SensitiveBytes>>;

    /// Destroy a secret blob.
    fn delete_secret(&self, alias: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_defaults() {
        let policy = KeyPolicy::unrestricted();
        assert!(!policy.require_user_auth);
        assert!(policy.auth_validity.is_none());

        let gated = KeyPolicy::user_auth(Duration::from_secs(30));
        assert!(gated.require_user_auth);
        assert_eq!(gated.auth_validity, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_policy_serialization() {
        let policy = KeyPolicy::user_auth(Duration::from_secs(10));
        let json = serde_json::to_string(&policy).unwrap();
        let back: KeyPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, policy);
    }
}
