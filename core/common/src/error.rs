//! Common error types for HushVault.

use thiserror::Error;

/// Top-level error type for HushVault operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Wrong password, wrong key, or tampered ciphertext.
    ///
    /// Carries no detail: the caller must not be able to tell
    /// the causes apart.
    #[error("Authentication failed")]
    AuthenticationFailure,

    /// The vault has no key material or verifier yet.
    #[error("Vault is not initialized")]
    NotInitialized,

    /// The operation needs an unlocked vault.
    #[error("No active vault session")]
    SessionNotActive,

    /// The session was locked or replaced while the operation was pending.
    #[error("Vault session was invalidated")]
    SessionInvalidated,

    /// Decryption succeeded but the content hash does not match.
    #[error("Integrity mismatch for item {0}")]
    IntegrityMismatch(String),

    /// Folder nesting would exceed the configured maximum.
    #[error("Folder depth {depth} exceeds maximum of {max}")]
    DepthExceeded { depth: u8, max: u8 },

    /// The gesture recognizer is locked out.
    #[error("Too many failed attempts, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Biometric confirmation was rejected.
    #[error("Biometric authentication failed")]
    BiometricFailed,

    /// The user dismissed the biometric prompt.
    #[error("Biometric authentication cancelled")]
    BiometricCancelled,

    /// No biometric hardware, or nothing enrolled.
    #[error("Biometric authentication unavailable: {0}")]
    BiometricUnavailable(String),

    /// Cryptographic operation failed for a reason other than authentication.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Key store operation failed.
    #[error("Key store error: {0}")]
    KeyStore(String),

    /// Persistence operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),
}

impl Error {
    /// Whether this error belongs to the "could not authenticate" class.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            Error::AuthenticationFailure | Error::BiometricFailed | Error::BiometricCancelled
        )
    }

    /// Message suitable for display to the vault owner.
    ///
    /// Every failed unlock reads the same regardless of its cause.
    pub fn user_message(&self) -> String {
        match self {
            Error::AuthenticationFailure => "Incorrect password".to_string(),
            Error::IntegrityMismatch(_) => "This item is damaged".to_string(),
            Error::BiometricFailed | Error::BiometricCancelled => {
                "Authentication was not completed".to_string()
            }
            Error::RateLimited { .. } => "Please try again later".to_string(),
            Error::SessionNotActive | Error::SessionInvalidated => {
                "The vault is locked".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authentication_message_is_generic() {
        assert_eq!(Error::AuthenticationFailure.user_message(), "Incorrect password");
        assert_eq!(
            Error::BiometricFailed.user_message(),
            "Authentication was not completed"
        );
    }

    #[test]
    fn test_integrity_mismatch_is_not_a_password_error() {
        let err = Error::IntegrityMismatch("abc".into());
        assert_eq!(err.user_message(), "This item is damaged");
        assert!(!err.is_authentication_failure());
    }

    #[test]
    fn test_authentication_class() {
        assert!(Error::AuthenticationFailure.is_authentication_failure());
        assert!(Error::BiometricCancelled.is_authentication_failure());
        assert!(!Error::NotInitialized.is_authentication_failure());
    }

    #[test]
    fn test_depth_exceeded_display() {
        let err = Error::DepthExceeded { depth: 4, max: 3 };
        assert_eq!(err.to_string(), "Folder depth 4 exceeds maximum of 3");
    }
}
