//! # Path Parsing
//!
//! | Path | Partition | Key |
//! |------|-----------|-----|
//! | `/kv/example_key` | `kv` | `example_key` |
//! | `/kv/` | `kv` | (empty) |
//! | `example_key` | default | `example_key` |

use shared_types::{KvError, KvResult};

/// A parsed `/<partition>/<key>` path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvPath<'a> {
    /// `None` routes to the default partition.
    pub partition: Option<&'a str>,
    pub key: &'a str,
}

impl<'a> KvPath<'a> {
    /// Split `path` into partition and key. The key may be empty.
    pub fn parse(path: &'a str) -> KvResult<Self> {
        let Some(rest) = path.strip_prefix('/') else {
            return Ok(Self {
                partition: None,
                key: path,
            });
        };

        let (partition, key) = rest.split_once('/').unwrap_or((rest, ""));
        validate_partition(partition)?;
        Ok(Self {
            partition: Some(partition),
            key,
        })
    }

    /// Parse a path that must name a key.
    pub fn parse_key(path: &'a str) -> KvResult<Self> {
        let parsed = Self::parse(path)?;
        if parsed.key.is_empty() {
            return Err(KvError::InvalidArgument {
                reason: format!("path {:?} names no key", path),
            });
        }
        Ok(parsed)
    }

    /// The key, or `None` when the path stops at the partition.
    pub fn prefix(&self) -> Option<&'a str> {
        Some(self.key).filter(|k| !k.is_empty())
    }
}

/// Partition names are non-empty and contain no `/`.
pub fn validate_partition(name: &str) -> KvResult<()> {
    if name.is_empty() || name.contains('/') {
        return Err(KvError::InvalidArgument {
            reason: format!("invalid partition name {:?}", name),
        });
    }
    Ok(())
}
