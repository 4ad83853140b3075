//! Credential digests.
//!
//! Passwords are never stored; only their SHA-256 digest, rendered as
//! lowercase hex, reaches the accounts table.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Length of a digest produced by [`digest`], in hex characters.
pub const DIGEST_LEN: usize = 64;

/// Compute the SHA-256 digest of `secret` as a lowercase hex string.
#[must_use]
pub fn digest(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

/// Check that `secret` hashes to `expected`.
#[must_use]
pub fn verify(secret: &str, expected: &str) -> bool {
    digest(secret).as_bytes().ct_eq(expected.as_bytes()).into()
}
