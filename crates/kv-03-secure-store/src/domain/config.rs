//! # Secure Store Configuration

use shared_crypto::Cipher;

/// Configuration for a `SecureStore`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecureStoreConfig {
    /// AEAD used for new envelopes (default: XChaCha20-Poly1305).
    ///
    /// Existing envelopes record their own cipher and stay readable after
    /// this changes.
    pub cipher: Cipher,

    /// Reconcile rollback counters during `init` (default: true).
    pub reconcile_on_init: bool,
}

impl Default for SecureStoreConfig {
    fn default() -> Self {
        Self {
            cipher: Cipher::XChaCha20Poly1305,
            reconcile_on_init: true,
        }
    }
}

impl SecureStoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cipher(mut self, cipher: Cipher) -> Self {
        self.cipher = cipher;
        self
    }

    pub fn with_reconcile_on_init(mut self, enabled: bool) -> Self {
        self.reconcile_on_init = enabled;
        self
    }
}
