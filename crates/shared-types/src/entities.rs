//! # Core Entities
//!
//! Flag sets, record metadata and key rules common to all stores.

use crate::errors::{KvError, KvResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Maximum key length in bytes.
pub const MAX_KEY_SIZE: usize = 128;

/// Characters that may never appear in a key.
///
/// `/` is reserved for partition paths in the global API.
pub const FORBIDDEN_KEY_CHARS: &[char] = &['*', '/', '?', ':', ';', '"', '|', '<', '>', '\\'];

/// Per-record creation flags.
///
/// Set once when a record is written and never changed afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KvFlags(u32);

impl KvFlags {
    /// No flags.
    pub const NONE: KvFlags = KvFlags(0);
    /// Record can only be removed by a full store reset.
    pub const WRITE_ONCE: KvFlags = KvFlags(1 << 0);
    /// Value must be stored encrypted.
    pub const REQUIRE_CONFIDENTIALITY: KvFlags = KvFlags(1 << 1);
    /// Value must be authenticated on every read.
    pub const REQUIRE_INTEGRITY: KvFlags = KvFlags(1 << 2);
    /// Value must be bound to a monotonic counter.
    pub const REQUIRE_REPLAY_PROTECTION: KvFlags = KvFlags(1 << 3);

    /// Every caller-visible flag.
    pub const ALL: KvFlags = KvFlags(0b1111);

    /// The three flags only a secure store enforces.
    pub const SECURITY_MASK: KvFlags = KvFlags(
        Self::REQUIRE_CONFIDENTIALITY.0
            | Self::REQUIRE_INTEGRITY.0
            | Self::REQUIRE_REPLAY_PROTECTION.0,
    );

    /// Build from raw bits, rejecting unknown ones.
    pub fn from_bits(bits: u32) -> Option<Self> {
        if bits & !Self::ALL.0 != 0 {
            return None;
        }
        Some(Self(bits))
    }

    /// Build from raw bits, dropping unknown ones.
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & Self::ALL.0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when every bit of `other` is set in `self`.
    pub const fn contains(self, other: KvFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// True when any bit of `other` is set in `self`.
    pub const fn intersects(self, other: KvFlags) -> bool {
        self.0 & other.0 != 0
    }

    /// True when the record needs any secure-store treatment.
    pub const fn is_secured(self) -> bool {
        self.intersects(Self::SECURITY_MASK)
    }

    pub const fn is_write_once(self) -> bool {
        self.contains(Self::WRITE_ONCE)
    }
}

impl BitOr for KvFlags {
    type Output = KvFlags;

    fn bitor(self, rhs: KvFlags) -> KvFlags {
        KvFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for KvFlags {
    fn bitor_assign(&mut self, rhs: KvFlags) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for KvFlags {
    type Output = KvFlags;

    fn bitand(self, rhs: KvFlags) -> KvFlags {
        KvFlags(self.0 & rhs.0)
    }
}

impl fmt::Display for KvFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Record metadata returned by `get_info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvInfo {
    /// Size of the value as the caller wrote it.
    pub size: usize,
    /// Flags the record was created with.
    pub flags: KvFlags,
}

/// Check a key against the naming rules shared by all stores.
///
/// # Errors
///
/// Returns `KvError::InvalidArgument` for empty, oversized, or
/// forbidden-character keys.
pub fn validate_key(key: &str) -> KvResult<()> {
    if key.is_empty() {
        return Err(KvError::InvalidArgument {
            reason: "key is empty".to_string(),
        });
    }
    if key.len() > MAX_KEY_SIZE {
        return Err(KvError::InvalidArgument {
            reason: format!("key is {} bytes, max {}", key.len(), MAX_KEY_SIZE),
        });
    }
    if let Some(c) = key
        .chars()
        .find(|c| FORBIDDEN_KEY_CHARS.contains(c) || c.is_control())
    {
        return Err(KvError::InvalidArgument {
            reason: format!("key contains forbidden character {:?}", c),
        });
    }
    Ok(())
}
