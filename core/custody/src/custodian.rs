//! Key custodian.
//!
//! Owns the vault master key, the password verifier and the optional
//! biometric unlock enrollment. All persistent key material lives inside a
//! [`KeyStore`]; the custodian only decides who may take it out.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::biometric::{BiometricPrompt, PromptRequest};
use crate::keystore::{KeyPolicy, KeyStore};
use crate::verifier::PasswordVerifier;
use hushvault_common::{Clock, Error, Result, SensitiveBytes, SystemClock};
use hushvault_crypto::{decrypt_with_key, encrypt_with_key, EncryptedData, KdfParams, VaultKey};

/// Alias of the vault master key.
pub const MASTER_KEY_ALIAS: &str = "hushvault.master";
/// Alias of the key that seals the biometric unlock credential.
pub const BIOMETRIC_KEY_ALIAS: &str = "hushvault.biometric";

const VERIFIER_SECRET: &str = "hushvault.verifier";
const BIOMETRIC_CREDENTIAL_SECRET: &str = "hushvault.biometric.credential";

/// How long one biometric confirmation stays valid on platforms without
/// per-operation authentication.
pub const DEFAULT_BIOMETRIC_VALIDITY: Duration = Duration::from_secs(30);

/// Guards the vault's key material.
pub struct KeyCustodian {
    store: Arc<dyn KeyStore>,
    kdf_params: KdfParams,
    biometric_validity: Duration,
    clock: Arc<dyn Clock>,
    last_biometric_auth: Mutex<Option<DateTime<Utc>>>,
}

impl KeyCustodian {
    /// Create a custodian over `store`.
    pub fn new(store: Arc<dyn KeyStore>, kdf_params: KdfParams) -> Self {
        Self {
            store,
            kdf_params,
            biometric_validity: DEFAULT_BIOMETRIC_VALIDITY,
            clock: Arc::new(SystemClock),
            last_biometric_auth: Mutex::new(None),
        }
    }

    /// Use a custom time source for biometric validity windows.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Override the biometric validity window used for new enrollments.
    pub fn with_biometric_validity(mut self, validity: Duration) -> Self {
        self.biometric_validity = validity;
        self
    }

    pub fn key_store(&self) -> &Arc<dyn KeyStore> {
        &self.store
    }

    /// Set up a new vault protected by `password`.
    ///
    /// Stores a password verifier and provisions a random master key. The
    /// master key is not derived from the password, so the verifier reveals
    /// nothing about it.
    ///
    /// Calling this on an initialized vault replaces the verifier and the
    /// master key. Anything encrypted under the old key becomes unreadable.
    ///
    /// # Errors
    /// - `InvalidInput` if the password is empty
    /// - `KeyStore` if the key store rejects the write
    pub fn initialize_vault(&self, password: &[u8]) -> Result<()> {
        if self.is_vault_initialized()? {
            warn!(store = self.store.name(), "Re-initializing vault, existing keys are replaced");
        }

        let verifier = PasswordVerifier::create(password, &self.kdf_params)?;
        self.store.put_secret(VERIFIER_SECRET, &verifier.to_bytes()?)?;
        self.store
            .generate_key(MASTER_KEY_ALIAS, KeyPolicy::unrestricted())?;

        // Any old enrollment sealed a credential that no longer matches.
        self.clear_biometric()?;

        info!(
            store = self.store.name(),
            hardware_backed = self.store.is_hardware_backed(),
            "Vault initialized"
        );
        Ok(())
    }

    pub fn is_vault_initialized(&self) -> Result<bool> {
        Ok(self.store.get_secret(VERIFIER_SECRET)?.is_some()
            && self.store.contains_key(MASTER_KEY_ALIAS)?)
    }

    /// Check a candidate password against the stored verifier.
    ///
    /// # Errors
    /// Returns `NotInitialized` if no vault has been set up.
    pub fn verify_password(&self, password: &[u8]) -> Result<bool> {
        let verifier = self.load_verifier()?;
        let ok = verifier.verify(password)?;
        debug!(ok, "Password verification");
        Ok(ok)
    }

    /// Replace the password.
    ///
    /// Returns `Ok(false)` and changes nothing if `old` is wrong. On success
    /// the verifier is re-salted and biometric unlock is revoked, since the
    /// credential it seals is the old password.
    ///
    /// The master key is unchanged, so existing items stay readable.
    pub fn change_password(&self, old: &[u8], new: &[u8]) -> Result<bool> {
        if !self.verify_password(old)? {
            return Ok(false);
        }

        let verifier = PasswordVerifier::create(new, &self.kdf_params)?;
        self.store.put_secret(VERIFIER_SECRET, &verifier.to_bytes()?)?;

        if self.is_biometric_enrolled()? {
            info!("Password changed, biometric unlock revoked");
        }
        self.clear_biometric()?;

        info!("Password changed");
        Ok(true)
    }

    /// Take the master key out of the key store.
    ///
    /// Callers must have verified the password first; the vault manager only
    /// calls this after a successful unlock.
    ///
    /// # Errors
    /// Returns `NotInitialized` if no master key exists.
    pub fn get_vault_key(&self) -> Result<VaultKey> {
        self.store
            .get_key(MASTER_KEY_ALIAS)?
            .ok_or(Error::NotInitialized)
    }

    /// Enable biometric unlock.
    ///
    /// The password is sealed under a new key whose policy requires user
    /// authentication. A later biometric confirmation releases the password,
    /// which then goes through the normal unlock path.
    ///
    /// # Errors
    /// - `NotInitialized` if no vault has been set up
    /// - `AuthenticationFailure` if the password is wrong
    pub fn enroll_biometric(&self, password: &[u8]) -> Result<()> {
        if !self.verify_password(password)? {
            return Err(Error::AuthenticationFailure);
        }

        self.store.generate_key(
            BIOMETRIC_KEY_ALIAS,
            KeyPolicy::user_auth(self.biometric_validity),
        )?;
        let key = self
            .store
            .get_key(BIOMETRIC_KEY_ALIAS)?
            .ok_or_else(|| Error::KeyStore("Biometric key was not persisted".to_string()))?;

        let sealed = encrypt_with_key(&key, password)?;
        self.store
            .put_secret(BIOMETRIC_CREDENTIAL_SECRET, &sealed.to_bytes())?;
        *self.last_biometric_auth.lock() = None;

        info!(
            per_operation_auth = self.store.supports_per_operation_auth(),
            "Biometric unlock enrolled"
        );
        Ok(())
    }

    pub fn is_biometric_enrolled(&self) -> Result<bool> {
        Ok(self.store.contains_key(BIOMETRIC_KEY_ALIAS)?
            && self.store.get_secret(BIOMETRIC_CREDENTIAL_SECRET)?.is_some())
    }

    /// Release the biometric-gated key.
    ///
    /// Prompts the user through `prompt` on every call when the key store
    /// enforces per-operation authentication. Otherwise a successful prompt
    /// is honoured for the key's validity window.
    ///
    /// # Errors
    /// - `BiometricUnavailable` if biometric unlock is not enrolled
    /// - `BiometricFailed` / `BiometricCancelled` from the prompt
    pub async fn biometric_key(&self, prompt: &dyn BiometricPrompt) -> Result<VaultKey> {
        if !self.is_biometric_enrolled()? {
            return Err(Error::BiometricUnavailable(
                "Biometric unlock is not enrolled".to_string(),
            ));
        }

        let per_operation = self.store.supports_per_operation_auth();
        if per_operation || !self.within_validity_window()? {
            let request = PromptRequest::new("Unlock vault", BIOMETRIC_KEY_ALIAS);
            let outcome = prompt.authenticate(&request).await;
            debug!(?outcome, "Biometric prompt finished");
            outcome.into_result()?;

            if !per_operation {
                *self.last_biometric_auth.lock() = Some(self.clock.now());
            }
        }

        self.store.get_key(BIOMETRIC_KEY_ALIAS)?.ok_or_else(|| {
            Error::BiometricUnavailable("Biometric key was removed".to_string())
        })
    }

    /// Release the password sealed at enrollment.
    pub async fn unlock_credential_with_biometric(
        &self,
        prompt: &dyn BiometricPrompt,
    ) -> Result<SensitiveBytes> {
        let key = self.biometric_key(prompt).await?;
        let sealed = self
            .store
            .get_secret(BIOMETRIC_CREDENTIAL_SECRET)?
            .ok_or_else(|| Error::BiometricUnavailable("Credential missing".to_string()))?;

        let data = EncryptedData::from_key_bytes(sealed.as_bytes())?;
        decrypt_with_key(&key, &data).map_err(|_| {
            warn!("Sealed biometric credential could not be opened");
            Error::BiometricUnavailable("Biometric credential is no longer valid".to_string())
        })
    }

    /// Turn biometric unlock off.
    pub fn disable_biometric(&self) -> Result<()> {
        self.clear_biometric()?;
        info!("Biometric unlock disabled");
        Ok(())
    }

    /// Destroy every key and record the custodian owns.
    ///
    /// # Security
    /// There is no recovery. Items encrypted under the master key become
    /// permanently unreadable.
    pub fn delete_vault_keys(&self) -> Result<()> {
        warn!(store = self.store.name(), "Deleting all vault keys");
        self.clear_biometric()?;
        self.store.delete_key(MASTER_KEY_ALIAS)?;
        self.store.delete_secret(VERIFIER_SECRET)?;
        Ok(())
    }

    fn load_verifier(&self) -> Result<PasswordVerifier> {
        let bytes = self
            .store
            .get_secret(VERIFIER_SECRET)?
            .ok_or(Error::NotInitialized)?;
        PasswordVerifier::from_bytes(bytes.as_bytes())
    }

    fn clear_biometric(&self) -> Result<()> {
        self.store.delete_key(BIOMETRIC_KEY_ALIAS)?;
        self.store.delete_secret(BIOMETRIC_CREDENTIAL_SECRET)?;
        *self.last_biometric_auth.lock() = None;
        Ok(())
    }

    fn within_validity_window(&self) -> Result<bool> {
        let Some(last) = *self.last_biometric_auth.lock() else {
            return Ok(false);
        };

        let validity = self
            .store
            .key_policy(BIOMETRIC_KEY_ALIAS)?
            .and_then(|policy| policy.auth_validity)
            .unwrap_or(Duration::ZERO);
        let validity = chrono::Duration::from_std(validity).unwrap_or(chrono::Duration::zero());

        Ok(self.clock.now() - last < validity)
    }
}
