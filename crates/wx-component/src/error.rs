//! Component error types.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use wx_crypto::CryptoError;

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, ComponentError>;

/// Errors that can occur while handling pushes or obtaining credentials.
///
/// The type is `Clone` so one token exchange result can be handed to every
/// caller waiting on it.
#[derive(Debug, Clone, Error)]
pub enum ComponentError {
    /// Invalid component configuration (e.g. an encoding key of the wrong length).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The envelope failed to decrypt (bad encoding, padding or framing).
    #[error("Decryption failed: {0}")]
    Crypto(#[from] CryptoError),

    /// The push signature does not match the shared token.
    #[error("Signature mismatch")]
    SignatureMismatch,

    /// The decrypted message names a different component.
    #[error("App id mismatch: expected {expected}, got {actual}")]
    IdentityMismatch { expected: String, actual: String },

    /// The envelope or decrypted payload could not be parsed.
    #[error("Invalid notification payload: {0}")]
    InvalidPayload(String),

    /// No verify ticket cached - no push arrived yet or all pushes lapsed.
    #[error("No verify ticket cached for {app_id} - waiting for the next push")]
    TicketUnavailable { app_id: String },

    /// The platform answered with a non-zero `errcode`.
    #[error("Remote API error {code}: {message}")]
    RemoteApi { code: i64, message: String },

    /// Network error.
    #[error("Transport error: {0}")]
    Transport(#[source] Arc<reqwest::Error>),

    /// Request or response body could not be (de)serialized.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Credential store failure.
    #[error("Credential store error: {0}")]
    Store(String),

    /// The caller's deadline passed before the shared exchange finished.
    #[error("Deadline of {0:?} exceeded while waiting for an access token")]
    DeadlineExceeded(Duration),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ComponentError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn invalid_payload(msg: impl Into<String>) -> Self {
        Self::InvalidPayload(msg.into())
    }

    /// Check if this error means an inbound push must be rejected as untrusted.
    pub fn is_integrity_failure(&self) -> bool {
        match self {
            Self::Crypto(e) => e.is_integrity_failure(),
            Self::SignatureMismatch | Self::IdentityMismatch { .. } | Self::InvalidPayload(_) => {
                true
            }
            _ => false,
        }
    }

    /// Check if this error is transient and the caller may retry with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Decode(_) | Self::Store(_) | Self::DeadlineExceeded(_)
        )
    }

    /// Check if the platform reported the component access token as invalid or expired.
    pub fn is_token_rejected(&self) -> bool {
        matches!(self, Self::RemoteApi { code: 40001 | 40014 | 42001, .. })
    }
}

impl From<reqwest::Error> for ComponentError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(Arc::new(err))
    }
}

impl From<serde_json::Error> for ComponentError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<sqlx::Error> for ComponentError {
    fn from(err: sqlx::Error) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<quick_xml::de::DeError> for ComponentError {
    fn from(err: quick_xml::de::DeError) -> Self {
        Self::InvalidPayload(err.to_string())
    }
}
