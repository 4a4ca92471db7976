//! Authenticated encryption using XChaCha20-Poly1305.
//!
//! XChaCha20-Poly1305 provides both confidentiality and authenticity,
//! with a 24-byte nonce that is safe for random generation.
//!
//! Two families of functions are exposed: the password variants derive a
//! fresh Argon2id key from a random salt on every call, the `_with_key`
//! variants use a key the caller already holds and carry no salt.

use chacha20poly1305::{
    aead::{generic_array::GenericArray, Aead, AeadCore, KeyInit, OsRng},
    XChaCha20Poly1305,
};

use crate::kdf::{derive_key, KdfParams};
use crate::keys::{Salt, VaultKey, SALT_LENGTH};
use hushvault_common::{Error, Result, SensitiveBytes};

/// Nonce size for XChaCha20-Poly1305 (24 bytes).
pub const NONCE_SIZE: usize = 24;

/// Authentication tag size (16 bytes).
pub const TAG_SIZE: usize = 16;

/// Output of an encryption call.
///
/// Byte layout: `ciphertext ‖ nonce ‖ salt`, where the ciphertext carries the
/// authentication tag at its end and the salt is absent for key-based
/// encryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedData {
    /// Ciphertext with the Poly1305 tag appended.
    pub ciphertext: Vec<u8>,
    /// Random per-call nonce.
    pub nonce: [u8; NONCE_SIZE],
    /// KDF salt, `None` when a raw key was used.
    pub salt: Option<Salt>,
}

impl EncryptedData {
    /// Serialize to `ciphertext ‖ nonce ‖ salt`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let salt_len = if self.salt.is_some() { SALT_LENGTH } else { 0 };
        let mut out = Vec::with_capacity(self.ciphertext.len() + NONCE_SIZE + salt_len);
        out.extend_from_slice(&self.ciphertext);
        out.extend_from_slice(&self.nonce);
        if let Some(salt) = &self.salt {
            out.extend_from_slice(salt.as_bytes());
        }
        out
    }

    /// Parse bytes produced by [`encrypt_with_key`].
    ///
    /// Malformed input is reported as an authentication failure so that a
    /// truncated blob is indistinguishable from a wrong key.
    pub fn from_key_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < TAG_SIZE + NONCE_SIZE {
            return Err(Error::AuthenticationFailure);
        }
        let (ciphertext, nonce) = bytes.split_at(bytes.len() - NONCE_SIZE);
        Ok(Self {
            ciphertext: ciphertext.to_vec(),
            nonce: nonce.try_into().map_err(|_| Error::AuthenticationFailure)?,
            salt: None,
        })
    }

    /// Parse bytes produced by [`encrypt`].
    pub fn from_password_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < TAG_SIZE + NONCE_SIZE + SALT_LENGTH {
            return Err(Error::AuthenticationFailure);
        }
        let (rest, salt) = bytes.split_at(bytes.len() - SALT_LENGTH);
        let mut data = Self::from_key_bytes(rest)?;
        let salt: [u8; SALT_LENGTH] = salt.try_into().map_err(|_| Error::AuthenticationFailure)?;
        data.salt = Some(Salt::from_bytes(salt));
        Ok(data)
    }

    /// Total size in bytes of the serialized form.
    pub fn len(&self) -> usize {
        self.ciphertext.len() + NONCE_SIZE + self.salt.map_or(0, |_| SALT_LENGTH)
    }

    /// Whether the serialized form is empty (never true for valid data).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Encrypt plaintext under a key the caller already holds.
///
/// # Postconditions
/// - The nonce is freshly random, so repeated calls differ
/// - `salt` is `None`
pub fn encrypt_with_key(key: &VaultKey, plaintext: &[u8]) -> Result<EncryptedData> {
    let cipher = XChaCha20Poly1305::new(GenericArray::from_slice(key.as_bytes()));
    let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| Error::Crypto(format!("Encryption failed: {}", e)))?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    nonce_bytes.copy_from_slice(&nonce);

    Ok(EncryptedData {
        ciphertext,
        nonce: nonce_bytes,
        salt: None,
    })
}

/// Decrypt data produced by [`encrypt_with_key`].
///
/// # Errors
/// - `AuthenticationFailure` if the key is wrong or any byte was altered;
///   no plaintext is produced in that case
pub fn decrypt_with_key(key: &VaultKey, data: &EncryptedData) -> Result<SensitiveBytes> {
    if data.ciphertext.len() < TAG_SIZE {
        return Err(Error::AuthenticationFailure);
    }

    let cipher = XChaCha20Poly1305::new(GenericArray::from_slice(key.as_bytes()));
    let nonce = GenericArray::from_slice(&data.nonce);

    cipher
        .decrypt(nonce, data.ciphertext.as_slice())
        .map(SensitiveBytes::new)
        .map_err(|_| Error::AuthenticationFailure)
}

/// Encrypt plaintext under a password with default KDF parameters.
pub fn encrypt(plaintext: &[u8], password: &[u8]) -> Result<EncryptedData> {
    encrypt_with_params(plaintext, password, &KdfParams::default())
}

/// Encrypt plaintext under a password.
///
/// # Postconditions
/// - A fresh salt and nonce are generated
/// - The derived key is zeroized before returning
pub fn encrypt_with_params(
    plaintext: &[u8],
    password: &[u8],
    params: &KdfParams,
) -> Result<EncryptedData> {
    let salt = Salt::generate();
    let key = derive_key(password, &salt, params)?;
    let mut data = encrypt_with_key(&key, plaintext)?;
    data.salt = Some(salt);
    Ok(data)
}

/// Decrypt password-encrypted data with default KDF parameters.
pub fn decrypt(data: &EncryptedData, password: &[u8]) -> Result<SensitiveBytes> {
    decrypt_with_params(data, password, &KdfParams::default())
}

/// Decrypt password-encrypted data.
///
/// # Errors
/// - `AuthenticationFailure` for a wrong password, tampering, or missing salt
pub fn decrypt_with_params(
    data: &EncryptedData,
    password: &[u8],
    params: &KdfParams,
) -> Result<SensitiveBytes> {
    let salt = data.salt.ok_or(Error::AuthenticationFailure)?;
    let key = match derive_key(password, &salt, params) {
        Ok(key) => key,
        // An empty password can never have produced valid ciphertext.
        Err(Error::InvalidInput(_)) => return Err(Error::AuthenticationFailure),
        Err(e) => return Err(e),
    };
    decrypt_with_key(&key, data)
}
