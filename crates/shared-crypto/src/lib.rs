//! # Shared Crypto - Authenticated Encryption
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `symmetric` | XChaCha20-Poly1305, AES-256-GCM | Record encryption and tagging |
//!
//! Both ciphers share one 24-byte stored nonce and one 16-byte tag, so a
//! record format does not change with the cipher. Associated data binds a
//! ciphertext to its context (key name, counter, flags); moved elsewhere it
//! no longer opens.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod symmetric;

// Re-exports
pub use errors::CryptoError;
pub use symmetric::{
    decrypt_with_aad, encrypt_with_aad, encrypt_with_nonce, Cipher, Nonce, SecretKey, KEY_SIZE,
    NONCE_SIZE, TAG_SIZE,
};
