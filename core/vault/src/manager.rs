//! Vault manager: owns the session and drives its lifecycle.
//!
//! The manager is the single owner of the [`VaultSession`]. It creates the
//! session on unlock, replaces it on password change and destroys it on
//! lock, auto-lock and wipe. Item, folder and trash operations live in
//! sibling modules as further `impl VaultManager` blocks.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{RwLock, RwLockMappedWriteGuard, RwLockReadGuard, RwLockWriteGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::config::VaultSettings;
use crate::session::{SessionHandle, VaultSession};
use hushvault_common::{Clock, Error, Result, SystemClock};
use hushvault_custody::{BiometricPrompt, KeyCustodian, KeyStore};
use hushvault_storage::VaultStore;

/// Owns the vault session and every operation that needs it.
///
/// # Concurrency
/// The session sits behind an async `RwLock`. Reads share the lock;
/// mutations, `lock` and `change_password` take it exclusively. While a
/// lock or password change is waiting for exclusive access, newly arriving
/// operations fail fast with `SessionInvalidated` instead of queueing;
/// operations already holding the lock finish first.
pub struct VaultManager {
    pub(crate) custodian: Arc<KeyCustodian>,
    pub(crate) store: Arc<dyn VaultStore>,
    pub(crate) settings: VaultSettings,
    pub(crate) clock: Arc<dyn Clock>,
    session: Arc<RwLock<Option<VaultSession>>>,
    invalidations: Arc<AtomicUsize>,
    background: Mutex<Option<Background>>,
}

/// Time spent in the background, with the timer that locks when it runs out.
struct Background {
    since: DateTime<Utc>,
    timer: Option<JoinHandle<()>>,
    /// Set once the timer has destroyed the session.
    fired: Arc<AtomicBool>,
}

impl Drop for Background {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

/// Marks an in-progress session invalidation for as long as it lives.
struct Invalidation<'a>(&'a AtomicUsize);

impl<'a> Invalidation<'a> {
    fn begin(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for Invalidation<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Take the session out of `slot` and zeroize it.
///
/// Returns the handle of the destroyed session, if there was one.
/// `locked`, when given, is set before the slot is released so that anyone
/// who sees the empty slot also sees the flag.
async fn destroy_session(
    slot: &RwLock<Option<VaultSession>>,
    invalidations: &AtomicUsize,
    locked: Option<&AtomicBool>,
) -> Option<SessionHandle> {
    let _invalidation = Invalidation::begin(invalidations);
    let mut slot = slot.write().await;

    let mut session = slot.take()?;
    session.lock();
    if let Some(locked) = locked {
        locked.store(true, Ordering::SeqCst);
    }
    info!(session = %session.handle(), "Vault locked");
    Some(session.handle().clone())
}

/// Run Argon2id work off the async executor.
async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Crypto(format!("Key derivation task failed: {}", e)))?
}

impl VaultManager {
    /// Create a manager reading the system clock.
    ///
    /// # Errors
    /// Returns `InvalidInput` if `settings` do not validate.
    pub fn new(
        key_store: Arc<dyn KeyStore>,
        store: Arc<dyn VaultStore>,
        settings: VaultSettings,
    ) -> Result<Self> {
        Self::with_clock(key_store, store, settings, Arc::new(SystemClock))
    }

    /// Create a manager with a custom time source.
    pub fn with_clock(
        key_store: Arc<dyn KeyStore>,
        store: Arc<dyn VaultStore>,
        settings: VaultSettings,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        settings.validate()?;

        let custodian =
            KeyCustodian::new(key_store, settings.kdf_params.clone()).with_clock(clock.clone());

        Ok(Self {
            custodian: Arc::new(custodian),
            store,
            settings,
            clock,
            session: Arc::new(RwLock::new(None)),
            invalidations: Arc::new(AtomicUsize::new(0)),
            background: Mutex::new(None),
        })
    }

    pub fn settings(&self) -> &VaultSettings {
        &self.settings
    }

    /// Key custodian, for biometric enrollment and key store queries.
    pub fn custodian(&self) -> &Arc<KeyCustodian> {
        &self.custodian
    }

    /// Set up a new vault protected by `password`.
    ///
    /// # Errors
    /// - `AlreadyExists` if the vault is initialized; wipe it first
    /// - `InvalidInput` if the password is empty
    pub async fn initialize(&self, password: &[u8]) -> Result<()> {
        // Exclusive access keeps the check and the key write together.
        let _slot = self.session.write().await;
        if self.custodian.is_vault_initialized()? {
            return Err(Error::AlreadyExists("Vault is already initialized".to_string()));
        }

        let custodian = self.custodian.clone();
        let password = Zeroizing::new(password.to_vec());
        run_blocking(move || custodian.initialize_vault(&password)).await?;

        info!(store = self.store.name(), "Vault created");
        Ok(())
    }

    pub fn is_initialized(&self) -> Result<bool> {
        self.custodian.is_vault_initialized()
    }

    /// Unlock the vault with a password.
    ///
    /// # Preconditions
    /// - Vault must be initialized
    ///
    /// # Postconditions
    /// - A new session holds the vault key; any previous session is zeroized
    /// - On failure no item has been read or decrypted
    ///
    /// # Errors
    /// - `AuthenticationFailure` if the password is wrong
    /// - `NotInitialized` if no vault exists
    pub async fn unlock(&self, password: &[u8]) -> Result<SessionHandle> {
        let custodian = self.custodian.clone();
        let candidate = Zeroizing::new(password.to_vec());
        let verified = run_blocking(move || custodian.verify_password(&candidate)).await?;

        if !verified {
            warn!("Unlock rejected");
            return Err(Error::AuthenticationFailure);
        }

        let session = VaultSession::new(self.custodian.get_vault_key()?, self.clock.now());
        let handle = session.handle().clone();

        let _invalidation = Invalidation::begin(&self.invalidations);
        let mut slot = self.session.write().await;
        if let Some(mut previous) = slot.replace(session) {
            previous.lock();
        }
        drop(self.background.lock().take());

        info!(session = %handle, "Vault unlocked");
        Ok(handle)
    }

    /// Unlock with biometric confirmation.
    ///
    /// The prompt releases the password sealed at enrollment, which then goes
    /// through [`VaultManager::unlock`].
    ///
    /// # Errors
    /// - `BiometricUnavailable` if not enrolled or the credential is stale
    /// - `BiometricFailed` / `BiometricCancelled` from the prompt
    pub async fn unlock_with_biometric(
        &self,
        prompt: &dyn BiometricPrompt,
    ) -> Result<SessionHandle> {
        let credential = self
            .custodian
            .unlock_credential_with_biometric(prompt)
            .await
            .inspect_err(|e| {
                if e.is_authentication_failure() {
                    warn!("Biometric unlock rejected");
                }
            })?;
        self.unlock(credential.as_bytes()).await
    }

    /// Lock the vault.
    ///
    /// Waits for in-flight operations, then zeroizes the session key before
    /// returning. Locking a locked vault is a no-op.
    pub async fn lock(&self) {
        drop(self.background.lock().take());
        destroy_session(&self.session, &self.invalidations, None).await;
    }

    pub async fn is_unlocked(&self) -> bool {
        self.session.read().await.is_some()
    }

    pub async fn session_handle(&self) -> Option<SessionHandle> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|session| session.handle().clone())
    }

    /// Record that the app moved to the background.
    ///
    /// Arms a timer that destroys the session once the auto-lock timeout
    /// elapses, even if the app never returns to the foreground. Outside a
    /// tokio runtime no timer is armed and only [`Self::enter_foreground`]
    /// enforces the timeout.
    pub fn enter_background(&self) {
        let fired = Arc::new(AtomicBool::new(false));
        let timer = match Handle::try_current() {
            Ok(runtime) => {
                let session = self.session.clone();
                let invalidations = self.invalidations.clone();
                let fired = fired.clone();
                let timeout = self.settings.auto_lock_timeout;

                Some(runtime.spawn(async move {
                    tokio::time::sleep(timeout).await;
                    if destroy_session(&session, &invalidations, Some(&fired))
                        .await
                        .is_some()
                    {
                        info!("Auto-lock timeout elapsed in background");
                    }
                }))
            }
            Err(_) => {
                debug!("No runtime, background auto-lock timer not armed");
                None
            }
        };

        // Replacing an earlier record aborts its timer.
        *self.background.lock() = Some(Background {
            since: self.clock.now(),
            timer,
            fired,
        });
        debug!("Vault entered background");
    }

    /// Record that the app returned to the foreground.
    ///
    /// Cancels the background timer. Returns `true` if the session was
    /// destroyed because the time spent in the background exceeded the
    /// auto-lock timeout.
    pub async fn enter_foreground(&self) -> bool {
        let Some(background) = self.background.lock().take() else {
            return false;
        };
        if background.fired.load(Ordering::SeqCst) {
            return true;
        }

        let away = self.clock.now() - background.since;
        drop(background);
        if away > self.settings.auto_lock_timeout() && self.is_unlocked().await {
            info!(away_secs = away.num_seconds(), "Auto-lock timeout exceeded");
            self.lock().await;
            return true;
        }
        false
    }

    /// Change the vault password.
    ///
    /// Returns `Ok(false)` and changes nothing if `old` is wrong. On success
    /// an open session is replaced by a fresh one with a new handle, and
    /// biometric unlock is revoked.
    pub async fn change_password(&self, old: &[u8], new: &[u8]) -> Result<bool> {
        let _invalidation = Invalidation::begin(&self.invalidations);
        let mut slot = self.session.write().await;

        let custodian = self.custodian.clone();
        let old = Zeroizing::new(old.to_vec());
        let new = Zeroizing::new(new.to_vec());
        let changed = run_blocking(move || custodian.change_password(&old, &new)).await?;

        if !changed {
            warn!("Password change rejected");
            return Ok(false);
        }

        if let Some(mut previous) = slot.take() {
            previous.lock();
            let session = VaultSession::new(self.custodian.get_vault_key()?, self.clock.now());
            info!(session = %session.handle(), "Session replaced after password change");
            *slot = Some(session);
        }
        Ok(true)
    }

    /// Destroy the vault.
    ///
    /// Locks, deletes all key material and clears the store.
    ///
    /// # Security
    /// Irreversible. Every item becomes unrecoverable.
    pub async fn wipe(&self) -> Result<()> {
        drop(self.background.lock().take());
        let _invalidation = Invalidation::begin(&self.invalidations);
        let mut slot = self.session.write().await;

        if let Some(mut session) = slot.take() {
            session.lock();
        }
        self.custodian.delete_vault_keys()?;
        self.store.clear().await?;

        warn!(store = self.store.name(), "Vault wiped");
        Ok(())
    }

    fn ensure_not_invalidating(&self) -> Result<()> {
        if self.invalidations.load(Ordering::SeqCst) > 0 {
            debug!("Operation refused, session is being invalidated");
            return Err(Error::SessionInvalidated);
        }
        Ok(())
    }

    /// Shared access to the active session.
    pub(crate) async fn active_session(&self) -> Result<RwLockReadGuard<'_, VaultSession>> {
        self.ensure_not_invalidating()?;
        let slot = self.session.read().await;
        RwLockReadGuard::try_map(slot, |session| session.as_ref())
            .map_err(|_| Error::SessionNotActive)
    }

    /// Exclusive access to the active session.
    pub(crate) async fn active_session_mut(
        &self,
    ) -> Result<RwLockMappedWriteGuard<'_, VaultSession>> {
        self.ensure_not_invalidating()?;
        let slot = self.session.write().await;
        RwLockWriteGuard::try_map(slot, |session| session.as_mut())
            .map_err(|_| Error::SessionNotActive)
    }
}
