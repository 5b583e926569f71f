//! # Runtime Configuration
//!
//! Loaded from an optional JSON file named by `KV_CONFIG`, then
//! overridden by environment variables:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `KV_IMAGE` | `storage.image` |
//! | `KV_AUTO_FORMAT` | `storage.auto_format` |
//! | `KV_DEVICE_KEY` | `security.device_key` (64 hex chars) |
//! | `KV_CIPHER` | `security.cipher` |
//! | `KV_STRICT` | `security.strict` |
//!
//! ## Security Requirements
//!
//! - `device_key` MUST NOT be the all-zero default in production

use serde::{Deserialize, Serialize};
use shared_crypto::Cipher;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Environment variable naming the JSON config file.
pub const CONFIG_ENV: &str = "KV_CONFIG";

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub storage: StorageConfig,
    pub security: SecurityConfig,
}

/// Device geometry and partition layout, in erase blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Image file backing the device; in-memory when unset.
    pub image: Option<PathBuf>,
    pub erase_size: u64,
    pub program_size: u64,
    /// Raw `/kv/` partition.
    pub raw_blocks: u64,
    /// Data Store of the `/secure/` partition.
    pub secure_data_blocks: u64,
    /// Rollback-Protection Store of the `/secure/` partition.
    pub rollback_blocks: u64,
    /// Format blank partitions during `init`.
    pub auto_format: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            image: None,
            erase_size: 4096,
            program_size: 1,
            raw_blocks: 8,
            secure_data_blocks: 8,
            rollback_blocks: 4,
            auto_format: false,
        }
    }
}

impl StorageConfig {
    /// Total device size in bytes.
    pub fn device_size(&self) -> u64 {
        (self.raw_blocks + self.secure_data_blocks + self.rollback_blocks) * self.erase_size
    }
}

/// Cipher selection as written in config files and `KV_CIPHER`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CipherName {
    #[default]
    #[serde(rename = "xchacha20-poly1305")]
    XChaCha20Poly1305,
    #[serde(rename = "aes-256-gcm")]
    Aes256Gcm,
}

impl From<CipherName> for Cipher {
    fn from(name: CipherName) -> Self {
        match name {
            CipherName::XChaCha20Poly1305 => Cipher::XChaCha20Poly1305,
            CipherName::Aes256Gcm => Cipher::Aes256Gcm,
        }
    }
}

impl FromStr for CipherName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xchacha20-poly1305" | "xchacha20" => Ok(CipherName::XChaCha20Poly1305),
            "aes-256-gcm" | "aes256gcm" => Ok(CipherName::Aes256Gcm),
            other => Err(format!("unknown cipher {:?}", other)),
        }
    }
}

/// Secure partition settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Device key for the secure partition (32 bytes).
    /// MUST NOT be default in production.
    #[serde(with = "hex::serde")]
    pub device_key: [u8; 32],
    pub cipher: CipherName,
    /// Refuse to start with an insecure configuration.
    pub strict: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            device_key: [0u8; 32], // MUST be overridden in production
            cipher: CipherName::default(),
            strict: false,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid {var}: {reason}")]
    InvalidEnv { var: &'static str, reason: String },

    #[error("invalid storage layout: {0}")]
    Layout(String),

    #[error(
        "SECURITY VIOLATION: device key is the all-zero default. \
         Set KV_DEVICE_KEY or provide security.device_key in the config file."
    )]
    InsecureDeviceKey,
}

impl RuntimeConfig {
    /// Defaults, then `KV_CONFIG`, then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `KV_*` overrides, reading variables through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(image) = lookup("KV_IMAGE") {
            self.storage.image = Some(PathBuf::from(image));
        }
        if let Some(flag) = lookup("KV_AUTO_FORMAT") {
            self.storage.auto_format = parse_bool("KV_AUTO_FORMAT", &flag)?;
        }
        if let Some(key_hex) = lookup("KV_DEVICE_KEY") {
            let bytes = hex::decode(key_hex.trim()).map_err(|e| ConfigError::InvalidEnv {
                var: "KV_DEVICE_KEY",
                reason: e.to_string(),
            })?;
            self.security.device_key =
                bytes
                    .try_into()
                    .map_err(|bytes: Vec<u8>| ConfigError::InvalidEnv {
                        var: "KV_DEVICE_KEY",
                        reason: format!("must be 32 bytes (64 hex chars), got {}", bytes.len()),
                    })?;
        }
        if let Some(cipher) = lookup("KV_CIPHER") {
            self.security.cipher = cipher
                .parse()
                .map_err(|reason| ConfigError::InvalidEnv {
                    var: "KV_CIPHER",
                    reason,
                })?;
        }
        if let Some(flag) = lookup("KV_STRICT") {
            self.security.strict = parse_bool("KV_STRICT", &flag)?;
        }
        Ok(())
    }

    /// Check the partition layout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.storage;
        if s.erase_size == 0 || s.program_size == 0 || s.erase_size % s.program_size != 0 {
            return Err(ConfigError::Layout(format!(
                "erase size {} must be a non-zero multiple of program size {}",
                s.erase_size, s.program_size
            )));
        }
        for (name, blocks) in [
            ("raw_blocks", s.raw_blocks),
            ("secure_data_blocks", s.secure_data_blocks),
            ("rollback_blocks", s.rollback_blocks),
        ] {
            if blocks < 2 || blocks % 2 != 0 {
                return Err(ConfigError::Layout(format!(
                    "{} must be an even number of at least 2 blocks, got {}",
                    name, blocks
                )));
            }
        }
        Ok(())
    }

    /// Validate configuration for production readiness.
    ///
    /// # Returns
    ///
    /// Returns `Err` if the device key is the default zero value.
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        if self.security.device_key == [0u8; 32] {
            return Err(ConfigError::InsecureDeviceKey);
        }
        Ok(())
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnv {
            var,
            reason: format!("expected a boolean, got {:?}", other),
        }),
    }
}
