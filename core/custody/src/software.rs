//! In-memory key store.

use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

use crate::keystore::{KeyPolicy, KeyStore};
use hushvault_common::{Result, SensitiveBytes};
use hushvault_crypto::VaultKey;

/// Software key store.
///
/// Keys and secrets live in process memory and are zeroized when removed or
/// when the store is dropped. Useful for testing and for platforms without
/// a secure enclave. It cannot enforce user authentication itself; callers
/// such as the key custodian gate access to auth-bound keys.
pub struct SoftwareKeyStore {
    keys: RwLock<HashMap<String, (VaultKey, KeyPolicy)>>,
    secrets: RwLock<HashMap<String, SensitiveBytes>>,
    per_operation_auth: bool,
}

impl SoftwareKeyStore {
    /// Create an empty store that reports per-operation auth support.
    pub fn new() -> Self {
        Self {
            keys: RwLock::new(HashMap::new()),
            secrets: RwLock::new(HashMap::new()),
            per_operation_auth: true,
        }
    }

    /// Emulate a platform that only offers time-boxed key authorization.
    pub fn with_per_operation_auth(mut self, supported: bool) -> Self {
        self.per_operation_auth = supported;
        self
    }
}

impl Default for SoftwareKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyStore for SoftwareKeyStore {
    fn name(&self) -> &str {
        "software"
    }

    fn is_hardware_backed(&self) -> bool {
        false
    }

    fn supports_per_operation_auth(&self) -> bool {
        self.per_operation_auth
    }

    fn generate_key(&self, alias: &str, policy: KeyPolicy) -> Result<()> {
        debug!(alias, require_user_auth = policy.require_user_auth, "Generating key");
        self.keys
            .write()
            .insert(alias.to_string(), (VaultKey::generate(), policy));
        Ok(())
    }

    fn get_key(&self, alias: &str) -> Result<Option<VaultKey>> {
        Ok(self.keys.read().get(alias).map(|(key, _)| key.clone()))
    }

    fn key_policy(&self, alias: &str) -> Result<Option<KeyPolicy>> {
        Ok(self.keys.read().get(alias).map(|(_, policy)| *policy))
    }

    fn contains_key(&self, alias: &str) -> Result<bool> {
        Ok(self.keys.read().contains_key(alias))
    }

    fn delete_key(&self, alias: &str) -> Result<()> {
        debug!(alias, "Deleting key");
        self.keys.write().remove(alias);
        Ok(())
    }

    fn put_secret(&self, alias: &str, data: &[u8]) -> Result<()> {
        self.secrets
            .write()
            .insert(alias.to_string(), SensitiveBytes::new(data.to_vec()));
        Ok(())
    }

    fn get_secret(&self, alias: &str) -> Result<Option<SensitiveBytes>> {
        Ok(self.secrets.read().get(alias).cloned())
    }

    fn delete_secret(&self, alias: &str) -> Result<()> {
        self.secrets.write().remove(alias);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_generate_and_get_key() {
        let store = SoftwareKeyStore::new();
        assert!(!store.contains_key("k").unwrap());

        store.generate_key("k", KeyPolicy::unrestricted()).unwrap();

        assert!(store.contains_key("k").unwrap());
        let a = store.get_key("k").unwrap().unwrap();
        let b = store.get_key("k").unwrap().unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_regenerate_replaces_key() {
        let store = SoftwareKeyStore::new();
        store.generate_key("k", KeyPolicy::unrestricted()).unwrap();
        let first = store.get_key("k").unwrap().unwrap();

        store
            .generate_key("k", KeyPolicy::user_auth(Duration::from_secs(5)))
            .unwrap();

        let second = store.get_key("k").unwrap().unwrap();
        assert_ne!(first.as_bytes(), second.as_bytes());
        assert!(store.key_policy("k").unwrap().unwrap().require_user_auth);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let store = SoftwareKeyStore::new();
        store.generate_key("k", KeyPolicy::unrestricted()).unwrap();

        store.delete_key("k").unwrap();
        store.delete_key("k").unwrap();

        assert!(store.get_key("k").unwrap().is_none());
    }

    #[test]
    fn test_secrets() {
        let store = SoftwareKeyStore::new();
        store.put_secret("s", b"blob").unwrap();
        assert_eq!(store.get_secret("s").unwrap().unwrap().as_bytes(), b"blob");

        store.delete_secret("s").unwrap();
        assert!(store.get_secret("s").unwrap().is_none());
    }

    #[test]
    fn test_capability_flags() {
        let store = SoftwareKeyStore::new();
        assert!(!store.is_hardware_backed());
        assert!(store.supports_per_operation_auth());

        let windowed = SoftwareKeyStore::new().with_per_operation_auth(false);
        assert!(!windowed.supports_per_operation_auth());
    }
}
