//! Crypto error types.

use thiserror::Error;

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors raised while building a cipher or opening an envelope.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The configured `EncodingAESKey` does not decode to a 32-byte AES key.
    #[error("Invalid encoding key: {0}")]
    InvalidKey(String),

    /// The ciphertext is not valid base64 or not a whole number of AES blocks.
    #[error("Malformed ciphertext encoding: {0}")]
    MalformedEncoding(String),

    /// PKCS#7 padding check failed (tampered ciphertext or wrong key).
    #[error("Invalid padding")]
    InvalidPadding,

    /// The decrypted frame is shorter than its header or its declared length.
    #[error("Truncated payload: need {needed} bytes, {available} available")]
    TruncatedPayload { needed: usize, available: usize },

    /// The plaintext cannot be framed (length does not fit in the 4-byte header).
    #[error("Payload too large: {0} bytes")]
    PayloadTooLarge(usize),
}

impl CryptoError {
    /// Whether this error means the input failed an integrity check.
    ///
    /// Key errors are configuration problems, everything else is untrusted input.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            Self::MalformedEncoding(_) | Self::InvalidPadding | Self::TruncatedPayload { .. }
        )
    }
}
