//! Message envelope cipher.
//!
//! Frame layout before encryption:
//!
//! ```text
//! +-----------+-------------+-----------+--------+--------------+
//! | salt (16) | len (4, BE) | payload   | app id | pkcs7 (1-32) |
//! +-----------+-------------+-----------+--------+--------------+
//! ```
//!
//! The whole frame is AES-256-CBC encrypted with the key decoded from the
//! `EncodingAESKey` and an IV equal to the first 16 bytes of that key.

use std::fmt;

use aes::Aes256;
use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use byteorder::{BigEndian, ByteOrder};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::NoPadding};

use crate::error::{CryptoError, Result};

type Aes256CbcDec = cbc::Decryptor<Aes256>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;

/// AES key size in bytes.
pub const KEY_LEN: usize = 32;

/// AES block size in bytes.
pub const BLOCK_LEN: usize = 16;

/// Padding block size used by the platform's encoder.
pub const PADDING_BLOCK_LEN: usize = 32;

/// Random salt prefixed to every frame.
pub const SALT_LEN: usize = 16;

/// Salt plus the 4-byte payload length.
pub const HEADER_LEN: usize = SALT_LEN + 4;

/// Encoding keys are unpadded base64 and may carry non-zero trailing bits.
const KEY_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// A decrypted envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedMessage {
    /// The inner message (XML for component pushes).
    pub payload: Vec<u8>,
    /// The app id the sender placed after the payload. Untrusted until compared.
    pub app_id: String,
}

/// Envelope codec bound to one component's encoding key.
#[derive(Clone)]
pub struct MessageCipher {
    key: [u8; KEY_LEN],
    iv: [u8; BLOCK_LEN],
}

impl fmt::Debug for MessageCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageCipher")
            .field("key", &"<redacted>")
            .finish()
    }
}

impl MessageCipher {
    /// Build a cipher from the 43-character `EncodingAESKey`.
    pub fn new(encoding_aes_key: &str) -> Result<Self> {
        let decoded = KEY_ENGINE
            .decode(format!("{encoding_aes_key}="))
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

        let key: [u8; KEY_LEN] = decoded.as_slice().try_into().map_err(|_| {
            CryptoError::InvalidKey(format!(
                "expected {KEY_LEN} bytes after decoding, got {}",
                decoded.len()
            ))
        })?;

        Ok(Self::from_key(key))
    }

    /// Build a cipher from raw key bytes.
    pub fn from_key(key: [u8; KEY_LEN]) -> Self {
        let mut iv = [0u8; BLOCK_LEN];
        iv.copy_from_slice(&key[..BLOCK_LEN]);
        Self { key, iv }
    }

    /// Decrypt a base64 envelope into its payload and claimed app id.
    ///
    /// The caller is responsible for rejecting the message when `app_id` does
    /// not match the configured component.
    pub fn decrypt(&self, cipher_text: &str) -> Result<DecryptedMessage> {
        let mut buffer = STANDARD
            .decode(cipher_text.trim())
            .map_err(|e| CryptoError::MalformedEncoding(e.to_string()))?;

        if buffer.is_empty() || buffer.len() % BLOCK_LEN != 0 {
            return Err(CryptoError::MalformedEncoding(format!(
                "ciphertext length {} is not a positive multiple of {BLOCK_LEN}",
                buffer.len()
            )));
        }

        let decryptor = Aes256CbcDec::new_from_slices(&self.key, &self.iv)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        decryptor
            .decrypt_padded_mut::<NoPadding>(&mut buffer)
            .map_err(|e| CryptoError::MalformedEncoding(e.to_string()))?;

        let unpadded = strip_padding(&buffer)?;
        let (payload, app_id) = split_frame(unpadded)?;

        Ok(DecryptedMessage {
            payload: payload.to_vec(),
            app_id: String::from_utf8_lossy(app_id).into_owned(),
        })
    }

    /// Encrypt `payload` for `app_id` with a random salt.
    pub fn encrypt(&self, payload: &[u8], app_id: &str) -> Result<String> {
        self.encrypt_with_salt(payload, app_id, rand::random())
    }

    /// Encrypt with a caller-chosen salt. Deterministic for a fixed salt.
    pub fn encrypt_with_salt(
        &self,
        payload: &[u8],
        app_id: &str,
        salt: [u8; SALT_LEN],
    ) -> Result<String> {
        let declared =
            u32::try_from(payload.len()).map_err(|_| CryptoError::PayloadTooLarge(payload.len()))?;

        let mut buffer = Vec::with_capacity(
            HEADER_LEN + payload.len() + app_id.len() + PADDING_BLOCK_LEN,
        );
        buffer.extend_from_slice(&salt);
        let mut len_bytes = [0u8; 4];
        BigEndian::write_u32(&mut len_bytes, declared);
        buffer.extend_from_slice(&len_bytes);
        buffer.extend_from_slice(payload);
        buffer.extend_from_slice(app_id.as_bytes());
        apply_padding(&mut buffer);

        let len = buffer.len();
        let encryptor = Aes256CbcEnc::new_from_slices(&self.key, &self.iv)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        encryptor
            .encrypt_padded_mut::<NoPadding>(&mut buffer, len)
            .map_err(|e| CryptoError::MalformedEncoding(e.to_string()))?;

        Ok(STANDARD.encode(&buffer))
    }
}

fn apply_padding(buffer: &mut Vec<u8>) {
    let pad = PADDING_BLOCK_LEN - buffer.len() % PADDING_BLOCK_LEN;
    buffer.resize(buffer.len() + pad, pad as u8);
}

fn strip_padding(buffer: &[u8]) -> Result<&[u8]> {
    let Some(&last) = buffer.last() else {
        return Err(CryptoError::InvalidPadding);
    };
    let pad = last as usize;
    if pad == 0 || pad > PADDING_BLOCK_LEN || pad > buffer.len() {
        return Err(CryptoError::InvalidPadding);
    }

    let (body, padding) = buffer.split_at(buffer.len() - pad);
    if padding.iter().any(|&b| b != last) {
        return Err(CryptoError::InvalidPadding);
    }
    Ok(body)
}

fn split_frame(frame: &[u8]) -> Result<(&[u8], &[u8])> {
    if frame.len() < HEADER_LEN {
        return Err(CryptoError::TruncatedPayload {
            needed: HEADER_LEN,
            available: frame.len(),
        });
    }

    let declared = BigEndian::read_u32(&frame[SALT_LEN..HEADER_LEN]) as usize;
    let end = HEADER_LEN.saturating_add(declared);
    if end > frame.len() {
        return Err(CryptoError::TruncatedPayload {
            needed: end,
            available: frame.len(),
        });
    }

    Ok((&frame[HEADER_LEN..end], &frame[end..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENCODING_KEY: &str = "abcdefghijklmnopqrstuvwxyz0123456789ABCDEFG";

    fn cipher() -> MessageCipher {
        MessageCipher::new(ENCODING_KEY).unwrap()
    }

    /// Encrypt an arbitrary plaintext frame with the cipher's key and IV.
    fn seal_raw(cipher: &MessageCipher, mut frame: Vec<u8>) -> String {
        assert_eq!(frame.len() % BLOCK_LEN, 0);
        let len = frame.len();
        Aes256CbcEnc::new_from_slices(&cipher.key, &cipher.iv)
            .unwrap()
            .encrypt_padded_mut::<NoPadding>(&mut frame, len)
            .unwrap();
        STANDARD.encode(frame)
    }

    #[test]
    fn test_key_must_decode_to_32_bytes() {
        assert!(matches!(
            MessageCipher::new("short"),
            Err(CryptoError::InvalidKey(_))
        ));
        assert!(matches!(
            MessageCipher::new(&ENCODING_KEY[..42]),
            Err(CryptoError::InvalidKey(_))
        ));
        assert!(matches!(
            MessageCipher::new("not base64 at all!!!!!!!!!!!!!!!!!!!!!!!!!!"),
            Err(CryptoError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_iv_is_key_prefix() {
        let cipher = cipher();
        assert_eq!(cipher.iv, cipher.key[..BLOCK_LEN]);
    }

    #[test]
    fn test_debug_does_not_print_key() {
        let rendered = format!("{:?}", cipher());
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn test_padding_pads_to_32_byte_blocks() {
        let mut buf = vec![0u8; 20];
        apply_padding(&mut buf);
        assert_eq!(buf.len(), 32);
        assert!(buf[20..].iter().all(|&b| b == 12));

        let mut full = vec![0u8; 32];
        apply_padding(&mut full);
        assert_eq!(full.len(), 64);
        assert!(full[32..].iter().all(|&b| b == 32));
    }

    #[test]
    fn test_strip_padding_rejects_bad_values() {
        assert_eq!(strip_padding(&[]), Err(CryptoError::InvalidPadding));
        assert_eq!(strip_padding(&[1, 2, 0]), Err(CryptoError::InvalidPadding));
        assert_eq!(strip_padding(&[1, 3, 2]), Err(CryptoError::InvalidPadding));
        assert_eq!(strip_padding(&[33; 64]), Err(CryptoError::InvalidPadding));
        assert_eq!(strip_padding(&[7, 2, 2]), Ok(&[7u8][..]));
    }

    #[test]
    fn test_strip_padding_accepts_up_to_32() {
        assert_eq!(strip_padding(&[17; 17]), Ok(&[][..]));
        let mut buf = vec![1u8; 8];
        buf.extend_from_slice(&[24; 24]);
        assert_eq!(strip_padding(&buf), Ok(&[1u8; 8][..]));
    }

    #[test]
    fn test_decrypts_frame_with_full_32_byte_padding() {
        let cipher = cipher();
        let mut frame = vec![3u8; SALT_LEN];
        frame.extend_from_slice(&2u32.to_be_bytes());
        frame.extend_from_slice(b"ab");
        frame.extend_from_slice(b"wxabcdefgh");
        assert_eq!(frame.len(), PADDING_BLOCK_LEN);
        frame.extend_from_slice(&[0x20; PADDING_BLOCK_LEN]);

        let opened = cipher.decrypt(&seal_raw(&cipher, frame)).unwrap();
        assert_eq!(opened.payload, b"ab");
        assert_eq!(opened.app_id, "wxabcdefgh");
    }

    #[test]
    fn test_round_trip() {
        let cipher = cipher();
        let payload = b"<xml><InfoType><![CDATA[component_verify_ticket]]></InfoType></xml>";
        let sealed = cipher.encrypt(payload, "wx1234567890abcdef").unwrap();

        let opened = cipher.decrypt(&sealed).unwrap();
        assert_eq!(opened.payload, payload);
        assert_eq!(opened.app_id, "wx1234567890abcdef");
    }

    #[test]
    fn test_round_trip_empty_payload() {
        let cipher = cipher();
        let sealed = cipher.encrypt(b"", "wxapp").unwrap();
        let opened = cipher.decrypt(&sealed).unwrap();
        assert!(opened.payload.is_empty());
        assert_eq!(opened.app_id, "wxapp");
    }

    #[test]
    fn test_random_salt_changes_ciphertext() {
        let cipher = cipher();
        let a = cipher.encrypt_with_salt(b"same", "wxapp", [1; SALT_LEN]).unwrap();
        let b = cipher.encrypt_with_salt(b"same", "wxapp", [2; SALT_LEN]).unwrap();
        assert_ne!(a, b);
        assert_eq!(cipher.decrypt(&a).unwrap(), cipher.decrypt(&b).unwrap());
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let sealed = cipher().encrypt(b"hello", "wxapp").unwrap();
        let other = MessageCipher::from_key([7u8; KEY_LEN]);
        match other.decrypt(&sealed) {
            Err(_) => {}
            Ok(opened) => assert_ne!(opened.app_id, "wxapp"),
        }
    }

    #[test]
    fn test_malformed_base64() {
        assert!(matches!(
            cipher().decrypt("%%%not-base64%%%"),
            Err(CryptoError::MalformedEncoding(_))
        ));
    }

    #[test]
    fn test_not_block_aligned() {
        // 10 bytes decoded.
        let text = STANDARD.encode([0u8; 10]);
        assert!(matches!(
            cipher().decrypt(&text),
            Err(CryptoError::MalformedEncoding(_))
        ));
        assert!(matches!(
            cipher().decrypt(""),
            Err(CryptoError::MalformedEncoding(_))
        ));
    }

    #[test]
    fn test_declared_length_beyond_buffer() {
        let cipher = cipher();
        let mut frame = vec![0u8; SALT_LEN];
        frame.extend_from_slice(&1000u32.to_be_bytes());
        frame.extend_from_slice(b"short");
        apply_padding(&mut frame);

        let err = cipher.decrypt(&seal_raw(&cipher, frame)).unwrap_err();
        assert_eq!(
            err,
            CryptoError::TruncatedPayload {
                needed: HEADER_LEN + 1000,
                available: HEADER_LEN + 5,
            }
        );
    }

    #[test]
    fn test_frame_shorter_than_header() {
        let cipher = cipher();
        let mut frame = vec![0u8; 10];
        apply_padding(&mut frame);

        let err = cipher.decrypt(&seal_raw(&cipher, frame)).unwrap_err();
        assert!(matches!(err, CryptoError::TruncatedPayload { needed: HEADER_LEN, .. }));
    }

    #[test]
    fn test_empty_app_id_is_returned_as_is() {
        let cipher = cipher();
        let mut frame = vec![9u8; SALT_LEN];
        frame.extend_from_slice(&3u32.to_be_bytes());
        frame.extend_from_slice(b"abc");
        apply_padding(&mut frame);

        let opened = cipher.decrypt(&seal_raw(&cipher, frame)).unwrap();
        assert_eq!(opened.payload, b"abc");
        assert_eq!(opened.app_id, "");
    }

    #[test]
    fn test_integrity_failure_classification() {
        assert!(CryptoError::InvalidPadding.is_integrity_failure());
        assert!(CryptoError::MalformedEncoding("x".into()).is_integrity_failure());
        assert!(!CryptoError::InvalidKey("x".into()).is_integrity_failure());
    }
}
