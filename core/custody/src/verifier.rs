//! Password verifier record.
//!
//! The vault never stores the password or anything encrypted under it for
//! verification purposes. Instead it keeps a salted Argon2id hash and
//! compares candidate hashes in constant time.

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use zeroize::ZeroizeOnDrop;

use hushvault_common::{Error, Result};
use hushvault_crypto::{derive_key, KdfParams, Salt, KEY_LENGTH};

const VERIFIER_VERSION: u32 = 1;

/// A salted password hash.
///
/// The hash is wiped when the record is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ZeroizeOnDrop)]
pub struct PasswordVerifier {
    #[zeroize(skip)]
    version: u32,
    #[zeroize(skip)]
    salt: Salt,
    #[zeroize(skip)]
    params: KdfParams,
    hash: [u8; KEY_LENGTH],
}

impl PasswordVerifier {
    /// Hash `password` under a fresh random salt.
    ///
    /// # Errors
    /// Returns `InvalidInput` if the password is empty.
    pub fn create(password: &[u8], params: &KdfParams) -> Result<Self> {
        let salt = Salt::generate();
        let derived = derive_key(password, &salt, params)?;

        Ok(Self {
            version: VERIFIER_VERSION,
            salt,
            params: params.clone(),
            hash: *derived.as_bytes(),
        })
    }

    /// Check a candidate password.
    ///
    /// The comparison runs in constant time with respect to the stored hash.
    /// An empty candidate never matches.
    pub fn verify(&self, password: &[u8]) -> Result<bool> {
        if password.is_empty() {
            return Ok(false);
        }

        let candidate = derive_key(password, &self.salt, &self.params)?;
        Ok(candidate.as_bytes().ct_eq(&self.hash).into())
    }

    /// KDF parameters the hash was produced with.
    pub fn params(&self) -> &KdfParams {
        &self.params
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let verifier: Self = serde_json::from_slice(bytes)?;
        if verifier.version != VERIFIER_VERSION {
            return Err(Error::Serialization(format!(
                "Unsupported verifier version: {}",
                verifier.version
            )));
        }
        Ok(verifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> KdfParams {
        KdfParams::new(1024, 1, 1).unwrap()
    }

    #[test]
    fn test_verify_correct_and_wrong() {
        let verifier = PasswordVerifier::create(b"Correct1!", &params()).unwrap();

        assert!(verifier.verify(b"Correct1!").unwrap());
        assert!(!verifier.verify(b"Wrong1!").unwrap());
        assert!(!verifier.verify(b"").unwrap());
    }

    #[test]
    fn test_salt_is_random() {
        let a = PasswordVerifier::create(b"same", &params()).unwrap();
        let b = PasswordVerifier::create(b"same", &params()).unwrap();

        assert_ne!(a.salt, b.salt);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn test_empty_password_rejected() {
        assert!(PasswordVerifier::create(b"", &params()).is_err());
    }

    #[test]
    fn test_serialization() {
        let verifier = PasswordVerifier::create(b"pw", &params()).unwrap();
        let bytes = verifier.to_bytes().unwrap();
        let restored = PasswordVerifier::from_bytes(&bytes).unwrap();

        assert_eq!(restored, verifier);
        assert!(restored.verify(b"pw").unwrap());
    }

    #[test]
    fn test_unknown_version_rejected() {
        let mut verifier = PasswordVerifier::create(b"pw", &params()).unwrap();
        verifier.version = 99;
        let bytes = verifier.to_bytes().unwrap();

        assert!(matches!(
            PasswordVerifier::from_bytes(&bytes),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn test_hash_wiped_on_drop() {
        fn wiped_on_drop<T: ZeroizeOnDrop>(_: &T) {}

        let verifier = PasswordVerifier::create(b"pw", &params()).unwrap();
        wiped_on_drop(&verifier);
        assert_ne!(verifier.hash, [0u8; KEY_LENGTH]);
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(PasswordVerifier::from_bytes(b"not json").is_err());
    }
}
