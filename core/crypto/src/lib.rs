//! Cryptographic primitives for HushVault.
//!
//! This module provides:
//! - Key derivation using Argon2id
//! - Authenticated encryption using XChaCha20-Poly1305, keyed either by a
//!   password or by a key the caller holds
//! - BLAKE2b-256 content digests
//! - Secure key management with automatic zeroization
//!
//! Every function here is pure: no state is shared between calls, so they
//! may run on any number of threads at once.
//!
//! # Security Guarantees
//! - All key material is automatically zeroized on drop
//! - No plaintext or key material is ever logged
//! - Decryption failures never reveal why they failed

pub mod aead;
pub mod hash;
pub mod kdf;
pub mod keys;

pub use aead::{
    decrypt, decrypt_with_key, decrypt_with_params, encrypt, encrypt_with_key,
    encrypt_with_params, EncryptedData, NONCE_SIZE, TAG_SIZE,
};
pub use hash::{digests_equal, hash, Digest, DIGEST_LENGTH};
pub use kdf::{derive_key, KdfParams};
pub use keys::{Salt, VaultKey, KEY_LENGTH, SALT_LENGTH};
