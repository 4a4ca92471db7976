//! Content digests for integrity checks.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest as _};
use subtle::ConstantTimeEq;

/// Length of a content digest in bytes (256-bit).
pub const DIGEST_LENGTH: usize = 32;

/// A BLAKE2b-256 digest.
pub type Digest = [u8; DIGEST_LENGTH];

/// Hash arbitrary bytes with BLAKE2b-256.
pub fn hash(data: &[u8]) -> Digest {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compare two digests without leaking the position of the first mismatch.
pub fn digests_equal(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
