//! Vault session management.
//!
//! A session holds the vault key in memory while the vault is unlocked.
//! The key is zeroized when the session is locked or dropped.

use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

use hushvault_common::{Error, Result};
use hushvault_crypto::VaultKey;

/// Session handle for tracking active sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionHandle(String);

impl SessionHandle {
    /// Generate a new unique session handle.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the handle string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// State of the vault session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Session is active and the key is available.
    Active,
    /// Session is locked, the key has been cleared.
    Locked,
}

/// Unlocked vault session.
///
/// Never persisted. Owned by the vault manager, which creates it on unlock
/// and destroys it on lock.
pub struct VaultSession {
    handle: SessionHandle,
    key: Option<VaultKey>,
    unlocked_at: DateTime<Utc>,
    state: SessionState,
}

impl VaultSession {
    /// Start a session around an already released vault key.
    pub fn new(key: VaultKey, unlocked_at: DateTime<Utc>) -> Self {
        Self {
            handle: SessionHandle::new(),
            key: Some(key),
            unlocked_at,
            state: SessionState::Active,
        }
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    pub fn unlocked_at(&self) -> DateTime<Utc> {
        self.unlocked_at
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Get the vault key, if the session is active.
    ///
    /// # Errors
    /// Returns `SessionNotActive` if the session is locked.
    pub fn key(&self) -> Result<&VaultKey> {
        match self.state {
            SessionState::Active => self.key.as_ref().ok_or(Error::SessionNotActive),
            SessionState::Locked => Err(Error::SessionNotActive),
        }
    }

    /// Lock the session, clearing the key from memory.
    ///
    /// # Postconditions
    /// - The key bytes are zeroized before this returns
    /// - Session state is Locked
    pub fn lock(&mut self) {
        // VaultKey zeroizes on drop.
        drop(self.key.take());
        self.state = SessionState::Locked;
    }
}

impl Drop for VaultSession {
    fn drop(&mut self) {
        self.lock();
    }
}

impl fmt::Debug for VaultSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultSession")
            .field("handle", &self.handle)
            .field("unlocked_at", &self.unlocked_at)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
