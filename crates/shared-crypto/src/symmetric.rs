//! # Authenticated Encryption
//!
//! XChaCha20-Poly1305 (default) and AES-256-GCM, both with associated
//! data and a 16-byte tag.
//!
//! Nonces are random. Both ciphers read them from the same 24-byte value
//! (AES-GCM uses the first 12 bytes), so callers store one fixed-size nonce
//! whatever the cipher.

use crate::CryptoError;
use aes_gcm::Aes256Gcm;
use chacha20poly1305::{
    aead::{generic_array::GenericArray, Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use zeroize::Zeroize;

/// Key size in bytes (256 bits).
pub const KEY_SIZE: usize = 32;

/// Stored nonce size in bytes.
pub const NONCE_SIZE: usize = 24;

/// Authentication tag size in bytes, identical for both ciphers.
pub const TAG_SIZE: usize = 16;

const GCM_NONCE_SIZE: usize = 12;

/// Secret key (256-bit).
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SecretKey([u8; KEY_SIZE]);

impl SecretKey {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, which must be exactly `KEY_SIZE` bytes.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKeyLength` on any other length.
    pub fn from_slice(slice: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; KEY_SIZE] =
            slice
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: KEY_SIZE,
                    actual: slice.len(),
                })?;
        Ok(Self(bytes))
    }

    /// Fresh key from the thread RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
        Self(bytes)
    }

    /// True for the all-zero placeholder key.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// Get inner bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretKey([REDACTED])")
    }
}

/// Nonce for encryption.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Nonce([u8; NONCE_SIZE]);

impl Nonce {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Fresh random nonce.
    pub fn generate() -> Self {
        let mut bytes = [0u8; NONCE_SIZE];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
        Self(bytes)
    }

    /// Get inner bytes.
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

/// AEAD algorithm of a ciphertext.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cipher {
    /// XChaCha20-Poly1305
    #[default]
    XChaCha20Poly1305,
    /// AES-256-GCM, nonce truncated to 96 bits
    Aes256Gcm,
}

impl Cipher {
    /// One-byte identifier persisted next to ciphertexts.
    pub fn id(self) -> u8 {
        match self {
            Cipher::XChaCha20Poly1305 => 1,
            Cipher::Aes256Gcm => 2,
        }
    }

    /// Inverse of [`Cipher::id`].
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Cipher::XChaCha20Poly1305),
            2 => Some(Cipher::Aes256Gcm),
            _ => None,
        }
    }
}

impl FromStr for Cipher {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xchacha20poly1305" | "xchacha" => Ok(Cipher::XChaCha20Poly1305),
            "aes256gcm" | "aes-256-gcm" | "aes" => Ok(Cipher::Aes256Gcm),
            other => Err(CryptoError::UnknownCipher(other.to_string())),
        }
    }
}

/// Encrypt `plaintext`, authenticating `aad` alongside it.
///
/// Returns (ciphertext || tag, nonce) under a fresh random nonce.
pub fn encrypt_with_aad(
    cipher: Cipher,
    key: &SecretKey,
    plaintext: &[u8],
    aad: &[u8],
) -> Result<(Vec<u8>, Nonce), CryptoError> {
    let nonce = Nonce::generate();
    let ciphertext = encrypt_with_nonce(cipher, key, plaintext, &nonce, aad)?;
    Ok((ciphertext, nonce))
}

/// Encrypt under a caller-chosen nonce.
///
/// For callers that must bind the nonce itself into `aad`. The nonce must
/// never repeat under one key; use [`Nonce::generate`].
pub fn encrypt_with_nonce(
    cipher: Cipher,
    key: &SecretKey,
    plaintext: &[u8],
    nonce: &Nonce,
    aad: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let payload = Payload {
        msg: plaintext,
        aad,
    };

    match cipher {
        Cipher::XChaCha20Poly1305 => XChaCha20Poly1305::new(key.as_bytes().into())
            .encrypt(XNonce::from_slice(nonce.as_bytes()), payload),
        Cipher::Aes256Gcm => Aes256Gcm::new(key.as_bytes().into()).encrypt(
            GenericArray::from_slice(&nonce.as_bytes()[..GCM_NONCE_SIZE]),
            payload,
        ),
    }
    .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))
}

/// Decrypt and verify `ciphertext` (ciphertext || tag) against `aad`.
///
/// # Errors
///
/// Returns `CryptoError::DecryptionFailed` if the tag does not verify.
pub fn decrypt_with_aad(
    cipher: Cipher,
    key: &SecretKey,
    ciphertext: &[u8],
    nonce: &Nonce,
    aad: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let payload = Payload {
        msg: ciphertext,
        aad,
    };

    match cipher {
        Cipher::XChaCha20Poly1305 => XChaCha20Poly1305::new(key.as_bytes().into())
            .decrypt(XNonce::from_slice(nonce.as_bytes()), payload),
        Cipher::Aes256Gcm => Aes256Gcm::new(key.as_bytes().into()).decrypt(
            GenericArray::from_slice(&nonce.as_bytes()[..GCM_NONCE_SIZE]),
            payload,
        ),
    }
    .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CIPHERS: [Cipher; 2] = [Cipher::XChaCha20Poly1305, Cipher::Aes256Gcm];

    #[test]
    fn test_both_ciphers_open_what_they_seal() {
        for cipher in CIPHERS {
            let key = SecretKey::generate();
            let plaintext = b"kv_store_example_value_hello_world";

            let (ciphertext, nonce) = encrypt_with_aad(cipher, &key, plaintext, b"ctx").unwrap();
            assert_eq!(ciphertext.len(), plaintext.len() + TAG_SIZE);
            let decrypted = decrypt_with_aad(cipher, &key, &ciphertext, &nonce, b"ctx").unwrap();

            assert_eq!(decrypted, plaintext);
        }
    }

    #[test]
    fn test_wrong_aad_fails() {
        for cipher in CIPHERS {
            let key = SecretKey::generate();
            let (ciphertext, nonce) = encrypt_with_aad(cipher, &key, b"value", b"counter=2").unwrap();
            let result = decrypt_with_aad(cipher, &key, &ciphertext, &nonce, b"counter=1");
            assert!(matches!(result, Err(CryptoError::DecryptionFailed(_))));
        }
    }

    #[test]
    fn test_other_key_or_flipped_bit_is_rejected() {
        let key = SecretKey::generate();
        let (mut sealed, nonce) =
            encrypt_with_aad(Cipher::default(), &key, b"device secret", b"").unwrap();

        let other = SecretKey::generate();
        assert!(decrypt_with_aad(Cipher::default(), &other, &sealed, &nonce, b"").is_err());

        sealed[0] ^= 0x01;
        assert!(decrypt_with_aad(Cipher::default(), &key, &sealed, &nonce, b"").is_err());
    }

    #[test]
    fn test_empty_message_is_tag_only() {
        let key = SecretKey::generate();
        let (tag, nonce) =
            encrypt_with_aad(Cipher::default(), &key, b"", b"authenticated plaintext").unwrap();
        assert_eq!(tag.len(), TAG_SIZE);
        assert!(decrypt_with_aad(Cipher::default(), &key, &tag, &nonce, b"authenticated plaintext")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_caller_nonce_can_be_bound_into_aad() {
        let key = SecretKey::generate();
        let nonce = Nonce::generate();
        let aad = nonce.as_bytes().to_vec();
        let ct = encrypt_with_nonce(Cipher::Aes256Gcm, &key, b"bound", &nonce, &aad).unwrap();

        assert_eq!(
            decrypt_with_aad(Cipher::Aes256Gcm, &key, &ct, &nonce, &aad).unwrap(),
            b"bound"
        );
        let other = Nonce::generate();
        assert!(decrypt_with_aad(Cipher::Aes256Gcm, &key, &ct, &other, &aad).is_err());
    }

    #[test]
    fn test_each_seal_draws_a_new_nonce() {
        let key = SecretKey::generate();
        let (first, n1) = encrypt_with_aad(Cipher::default(), &key, b"same", b"").unwrap();
        let (second, n2) = encrypt_with_aad(Cipher::default(), &key, b"same", b"").unwrap();
        assert_ne!(n1, n2);
        assert_ne!(first, second);
    }

    #[test]
    fn test_key_from_slice() {
        let bytes = hex::decode("00".repeat(KEY_SIZE)).unwrap();
        let key = SecretKey::from_slice(&bytes).unwrap();
        assert!(key.is_zero());
        assert_eq!(
            SecretKey::from_slice(&bytes[..5]).unwrap_err(),
            CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: 5
            }
        );
        assert_eq!(format!("{:?}", key), "SecretKey([REDACTED])");
    }

    #[test]
    fn test_cipher_ids_and_names() {
        for cipher in CIPHERS {
            assert_eq!(Cipher::from_id(cipher.id()), Some(cipher));
        }
        assert_eq!(Cipher::from_id(0), None);
        assert_eq!("aes256gcm".parse::<Cipher>().unwrap(), Cipher::Aes256Gcm);
        assert!("rot13".parse::<Cipher>().is_err());
    }
}
