//! Key custody for HushVault.
//!
//! Keeps the vault master key and password verifier inside a platform key
//! store, and gates an optional biometric unlock path behind a prompt.

pub mod biometric;
pub mod custodian;
pub mod keystore;
pub mod software;
pub mod verifier;

pub use biometric::{BiometricOutcome, BiometricPrompt, PromptRequest};
pub use custodian::{
    KeyCustodian, BIOMETRIC_KEY_ALIAS, DEFAULT_BIOMETRIC_VALIDITY, MASTER_KEY_ALIAS,
};
pub use keystore::{KeyPolicy, KeyStore};
pub use software::SoftwareKeyStore;
pub use verifier::PasswordVerifier;
