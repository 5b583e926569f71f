//! # Secure Envelope
//!
//! What the Data Store holds for a secured key:
//!
//! ```text
//! ┌──────────────────────── header (bincode, 42 bytes) ────────────────────────┐
//! │ version u8 │ cipher u8 │ flags u32 │ counter u64 │ data_size u32 │ nonce [24]│
//! └────────────────────────────────────────────────────────────────────────────┘
//! payload:
//!   REQUIRE_CONFIDENTIALITY  →  ciphertext ‖ tag
//!   otherwise                →  plaintext  ‖ tag
//! ```
//!
//! Associated data is `header ‖ key name`, so flags, counter, nonce and
//! the key itself are all bound to the tag. Without confidentiality the
//! tag is an AEAD seal of the empty message with the plaintext appended
//! to the associated data.

use serde::{Deserialize, Serialize};
use shared_crypto::{
    decrypt_with_aad, encrypt_with_nonce, Cipher, Nonce, SecretKey, NONCE_SIZE, TAG_SIZE,
};
use shared_types::{KvError, KvFlags};
use thiserror::Error;

pub const ENVELOPE_VERSION: u8 = 1;

/// Encoded size of `EnvelopeHeader`.
pub const ENVELOPE_HEADER_SIZE: usize = 1 + 1 + 4 + 8 + 4 + NONCE_SIZE;

/// Envelope decode and verification errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    #[error("envelope too short: {len} bytes")]
    TooShort { len: usize },

    #[error("envelope header: {0}")]
    Header(String),

    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(u8),

    #[error("unknown cipher id {0}")]
    UnknownCipher(u8),

    #[error("payload is {actual} bytes, header declares {declared} plus tag")]
    SizeMismatch { declared: usize, actual: usize },

    #[error("record flags {record} disagree with envelope flags {envelope}")]
    FlagMismatch { record: u32, envelope: u32 },

    #[error("authentication tag does not verify")]
    TagMismatch,

    #[error("sealing failed: {0}")]
    Seal(String),
}

impl From<EnvelopeError> for KvError {
    fn from(err: EnvelopeError) -> Self {
        match err {
            EnvelopeError::Seal(reason) => KvError::InvalidArgument { reason },
            other => KvError::auth_failed(other.to_string()),
        }
    }
}

/// Fixed-size envelope header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeHeader {
    pub version: u8,
    pub cipher: u8,
    pub flags: u32,
    pub counter: u64,
    pub data_size: u32,
    pub nonce: [u8; NONCE_SIZE],
}

impl EnvelopeHeader {
    pub fn to_bytes(&self) -> Result<Vec<u8>, EnvelopeError> {
        bincode::serialize(self).map_err(|e| EnvelopeError::Header(e.to_string()))
    }

    pub fn flags(&self) -> KvFlags {
        KvFlags::from_bits_truncate(self.flags)
    }

    pub fn cipher(&self) -> Result<Cipher, EnvelopeError> {
        Cipher::from_id(self.cipher).ok_or(EnvelopeError::UnknownCipher(self.cipher))
    }

    /// `header ‖ key name`.
    fn associated_data(&self, key: &str) -> Result<Vec<u8>, EnvelopeError> {
        let mut aad = self.to_bytes()?;
        aad.extend_from_slice(key.as_bytes());
        Ok(aad)
    }
}

/// A decoded envelope; the payload is still sealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub header: EnvelopeHeader,
    pub payload: Vec<u8>,
}

impl Envelope {
    /// Seal `value` for `key`.
    pub fn seal(
        cipher: Cipher,
        secret: &SecretKey,
        key: &str,
        value: &[u8],
        flags: KvFlags,
        counter: u64,
    ) -> Result<Self, EnvelopeError> {
        let data_size = u32::try_from(value.len())
            .map_err(|_| EnvelopeError::Seal(format!("value of {} bytes", value.len())))?;
        let nonce = Nonce::generate();
        let header = EnvelopeHeader {
            version: ENVELOPE_VERSION,
            cipher: cipher.id(),
            flags: flags.bits(),
            counter,
            data_size,
            nonce: *nonce.as_bytes(),
        };
        let aad = header.associated_data(key)?;

        let payload = if flags.contains(KvFlags::REQUIRE_CONFIDENTIALITY) {
            encrypt_with_nonce(cipher, secret, value, &nonce, &aad)
                .map_err(|e| EnvelopeError::Seal(e.to_string()))?
        } else {
            let mut bound = aad;
            bound.extend_from_slice(value);
            let tag = encrypt_with_nonce(cipher, secret, &[], &nonce, &bound)
                .map_err(|e| EnvelopeError::Seal(e.to_string()))?;
            let mut payload = Vec::with_capacity(value.len() + TAG_SIZE);
            payload.extend_from_slice(value);
            payload.extend_from_slice(&tag);
            payload
        };

        Ok(Self { header, payload })
    }

    /// Verify the tag and return the plaintext.
    pub fn open(&self, secret: &SecretKey, key: &str) -> Result<Vec<u8>, EnvelopeError> {
        let cipher = self.header.cipher()?;
        let nonce = Nonce::from_bytes(self.header.nonce);
        let aad = self.header.associated_data(key)?;
        let declared = self.header.data_size as usize;
        if self.payload.len() != declared + TAG_SIZE {
            return Err(EnvelopeError::SizeMismatch {
                declared,
                actual: self.payload.len(),
            });
        }

        if self.header.flags().contains(KvFlags::REQUIRE_CONFIDENTIALITY) {
            return decrypt_with_aad(cipher, secret, &self.payload, &nonce, &aad)
                .map_err(|_| EnvelopeError::TagMismatch);
        }

        let (plaintext, tag) = self.payload.split_at(declared);
        let mut bound = aad;
        bound.extend_from_slice(plaintext);
        decrypt_with_aad(cipher, secret, tag, &nonce, &bound)
            .map_err(|_| EnvelopeError::TagMismatch)?;
        Ok(plaintext.to_vec())
    }

    pub fn encode(&self) -> Result<Vec<u8>, EnvelopeError> {
        let mut out = self.header.to_bytes()?;
        out.extend_from_slice(&self.payload);
        Ok(out)
    }

    /// Parse an envelope and check its shape. The tag is not verified.
    pub fn decode(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        if bytes.len() < ENVELOPE_HEADER_SIZE {
            return Err(EnvelopeError::TooShort { len: bytes.len() });
        }
        let header: EnvelopeHeader = bincode::deserialize(&bytes[..ENVELOPE_HEADER_SIZE])
            .map_err(|e| EnvelopeError::Header(e.to_string()))?;
        if header.version != ENVELOPE_VERSION {
            return Err(EnvelopeError::UnsupportedVersion(header.version));
        }
        header.cipher()?;

        let payload = bytes[ENVELOPE_HEADER_SIZE..].to_vec();
        let declared = header.data_size as usize;
        if payload.len() != declared + TAG_SIZE {
            return Err(EnvelopeError::SizeMismatch {
                declared,
                actual: payload.len(),
            });
        }
        Ok(Self { header, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> SecretKey {
        SecretKey::from_bytes([7u8; 32])
    }

    #[test]
    fn test_header_size_matches_bincode() {
        let envelope = Envelope::seal(
            Cipher::default(),
            &secret(),
            "k",
            b"v",
            KvFlags::REQUIRE_INTEGRITY,
            0,
        )
        .unwrap();
        assert_eq!(envelope.header.to_bytes().unwrap().len(), ENVELOPE_HEADER_SIZE);
    }

    #[test]
    fn test_confidential_payload_hides_value() {
        let value = b"the quick brown fox jumps over";
        let envelope = Envelope::seal(
            Cipher::default(),
            &secret(),
            "k",
            value,
            KvFlags::REQUIRE_CONFIDENTIALITY,
            0,
        )
        .unwrap();
        let encoded = envelope.encode().unwrap();
        assert!(!encoded.windows(4).any(|w| value.windows(4).any(|v| v == w)));

        let decoded = Envelope::decode(&encoded).unwrap();
        assert_eq!(decoded.open(&secret(), "k").unwrap(), value);
    }

    #[test]
    fn test_integrity_only_payload_is_plaintext_plus_tag() {
        let envelope = Envelope::seal(
            Cipher::Aes256Gcm,
            &secret(),
            "k",
            b"visible",
            KvFlags::REQUIRE_INTEGRITY,
            0,
        )
        .unwrap();
        assert_eq!(&envelope.payload[..7], b"visible");
        assert_eq!(envelope.payload.len(), 7 + TAG_SIZE);
        assert_eq!(envelope.open(&secret(), "k").unwrap(), b"visible");
    }

    #[test]
    fn test_tamper_is_detected() {
        let flags = KvFlags::REQUIRE_INTEGRITY;
        let mut envelope =
            Envelope::seal(Cipher::default(), &secret(), "k", b"value", flags, 3).unwrap();

        envelope.payload[0] ^= 1;
        assert_eq!(envelope.open(&secret(), "k"), Err(EnvelopeError::TagMismatch));
        envelope.payload[0] ^= 1;

        envelope.header.counter = 4;
        assert_eq!(envelope.open(&secret(), "k"), Err(EnvelopeError::TagMismatch));
        envelope.header.counter = 3;

        assert_eq!(
            envelope.open(&secret(), "other_key"),
            Err(EnvelopeError::TagMismatch)
        );
        assert_eq!(
            envelope.open(&SecretKey::from_bytes([8u8; 32]), "k"),
            Err(EnvelopeError::TagMismatch)
        );
        assert_eq!(envelope.open(&secret(), "k").unwrap(), b"value");
    }

    #[test]
    fn test_decode_rejects_malformed_envelopes() {
        let encoded = Envelope::seal(
            Cipher::default(),
            &secret(),
            "k",
            b"value",
            KvFlags::REQUIRE_INTEGRITY,
            1,
        )
        .unwrap()
        .encode()
        .unwrap();

        assert!(matches!(
            Envelope::decode(&encoded[..10]),
            Err(EnvelopeError::TooShort { len: 10 })
        ));
        assert!(matches!(
            Envelope::decode(&encoded[..encoded.len() - 1]),
            Err(EnvelopeError::SizeMismatch { .. })
        ));

        let mut bad_version = encoded.clone();
        bad_version[0] = 9;
        assert_eq!(
            Envelope::decode(&bad_version),
            Err(EnvelopeError::UnsupportedVersion(9))
        );

        let mut bad_cipher = encoded;
        bad_cipher[1] = 0;
        assert_eq!(
            Envelope::decode(&bad_cipher),
            Err(EnvelopeError::UnknownCipher(0))
        );
    }

    #[test]
    fn test_envelope_errors_surface_as_authentication_failures() {
        let err: KvError = EnvelopeError::TagMismatch.into();
        assert!(matches!(err, KvError::AuthenticationFailed { .. }));
    }
}
