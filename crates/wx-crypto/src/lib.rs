//! wx-crypto: push authentication primitives for WeChat Open Platform components.
//!
//! The platform pushes notifications (verify tickets, authorization changes) to a
//! component's callback URL. Each push is signed with the component's shared token
//! and its body is encrypted with the component's `EncodingAESKey`.
//!
//! ## Signatures
//!
//! - [`signature::compute`] - SHA-1 over the sorted, concatenated parts
//! - [`signature::verify`] - constant-time check of a request `signature`
//! - [`signature::verify_message`] - constant-time check of a `msg_signature`
//!
//! ## Envelope
//!
//! - [`MessageCipher`] - AES-256-CBC envelope codec derived from the encoding key
//! - [`DecryptedMessage`] - payload bytes plus the app id claimed by the sender
//!
//! The envelope IV is the first 16 bytes of the key. This is fixed by the platform
//! protocol and cannot be changed without breaking interoperability; it means two
//! messages with equal salts and prefixes encrypt to equal ciphertext prefixes, and
//! that CBC bit flips in one block pass through to the next. The salt block at the
//! front of every message absorbs the first effect; callers must still treat the
//! app id check and payload parsing as part of authentication.

pub mod cipher;
pub mod error;
pub mod signature;

pub use cipher::{DecryptedMessage, MessageCipher};
pub use error::{CryptoError, Result};
