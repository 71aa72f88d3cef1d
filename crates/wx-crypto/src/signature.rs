//! Push request signatures.
//!
//! The platform signs every callback with `sha1(sort(token, timestamp, nonce))`,
//! hex encoded in lowercase. In safe mode it also sends `msg_signature`, which adds
//! the `Encrypt` field of the body to the sorted set.

use sha1::{Digest, Sha1};
use subtle::ConstantTimeEq;

/// Compute the signature over `parts`.
///
/// Parts are sorted byte-wise and concatenated without separators, so the
/// result does not depend on the order they are passed in.
pub fn compute(parts: &[&str]) -> String {
    let mut sorted = parts.to_vec();
    sorted.sort_unstable();

    let mut hasher = Sha1::new();
    for part in sorted {
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Verify a request `signature` against the shared token.
pub fn verify(token: &str, timestamp: &str, nonce: &str, signature: &str) -> bool {
    matches(&compute(&[token, timestamp, nonce]), signature)
}

/// Verify a `msg_signature`, which also covers the encrypted body.
pub fn verify_message(
    token: &str,
    timestamp: &str,
    nonce: &str,
    encrypt: &str,
    msg_signature: &str,
) -> bool {
    matches(&compute(&[token, timestamp, nonce, encrypt]), msg_signature)
}

// Length is public (always 40 hex chars), only the content comparison must not leak.
fn matches(expected: &str, provided: &str) -> bool {
    expected.len() == provided.len() && bool::from(expected.as_bytes().ct_eq(provided.as_bytes()))
}
