//! Crypto error types.

use thiserror::Error;

/// Errors from sealing or opening a value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Encryption failed
    #[error("Sealing failed: {0}")]
    EncryptionFailed(String),

    /// Decryption or tag verification failed
    #[error("Ciphertext did not authenticate: {0}")]
    DecryptionFailed(String),

    /// Invalid key length
    #[error("Key is {actual} bytes, expected {expected}")]
    InvalidKeyLength {
        /// Required length
        expected: usize,
        /// Length supplied
        actual: usize,
    },

    /// Unknown cipher identifier
    #[error("Unknown cipher: {0}")]
    UnknownCipher(String),
}
