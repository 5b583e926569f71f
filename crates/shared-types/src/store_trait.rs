//! # Key-Value Store Port
//!
//! The interface every store implements and every consumer depends on.
//! The secure overlay composes two values of this trait, and the global
//! facade routes paths to boxed trait objects.

use crate::entities::{KvFlags, KvInfo};
use crate::errors::{KvError, KvResult};
use crate::iterator::KvIterator;

/// A plain key-value store.
///
/// All operations are synchronous and may block on the device beneath.
/// Instances are not internally synchronized; callers sharing one across
/// threads must serialize every call (see `kv-04-global-api`).
pub trait KeyValueStore {
    /// Bring the store up from persistent state.
    ///
    /// Calling `init` twice without `deinit` fails with `NotReady`.
    fn init(&mut self) -> KvResult<()>;

    /// Release in-memory state. Persistent data is untouched.
    fn deinit(&mut self) -> KvResult<()>;

    /// Erase everything, write-once keys included.
    fn reset(&mut self) -> KvResult<()>;

    /// Create or overwrite `key`.
    fn set(&mut self, key: &str, value: &[u8], flags: KvFlags) -> KvResult<()>;

    /// Read the whole value of `key`.
    ///
    /// Fails with `BufferTooSmall` when the value is longer than
    /// `max_size`; partial reads are not supported. The returned vector's
    /// length is the actual size.
    fn get(&mut self, key: &str, max_size: usize) -> KvResult<Vec<u8>>;

    /// Size and creation flags of `key`.
    fn get_info(&mut self, key: &str) -> KvResult<KvInfo>;

    /// Remove `key`. Write-once keys are refused with `WriteProtected`.
    fn remove(&mut self, key: &str) -> KvResult<()>;

    /// Snapshot the live keys starting with `prefix` (all keys when `None`).
    fn iterator_open(&mut self, prefix: Option<&str>) -> KvResult<KvIterator>;

    /// Next key of the snapshot; `NotFound` once exhausted.
    ///
    /// A key longer than `max_key_size` fails with `BufferTooSmall` and
    /// stays at the head of the snapshot.
    fn iterator_next(&mut self, it: &mut KvIterator, max_key_size: usize) -> KvResult<String>;

    /// Release a snapshot.
    fn iterator_close(&mut self, it: KvIterator) -> KvResult<()>;

    /// Read `key` into `buf`, returning the actual size.
    fn get_into(&mut self, key: &str, buf: &mut [u8]) -> KvResult<usize> {
        let value = self.get(key, buf.len())?;
        buf[..value.len()].copy_from_slice(&value);
        Ok(value.len())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn init(&mut self) -> KvResult<()> {
        (**self).init()
    }

    fn deinit(&mut self) -> KvResult<()> {
        (**self).deinit()
    }

    fn reset(&mut self) -> KvResult<()> {
        (**self).reset()
    }

    fn set(&mut self, key: &str, value: &[u8], flags: KvFlags) -> KvResult<()> {
        (**self).set(key, value, flags)
    }

    fn get(&mut self, key: &str, max_size: usize) -> KvResult<Vec<u8>> {
        (**self).get(key, max_size)
    }

    fn get_info(&mut self, key: &str) -> KvResult<KvInfo> {
        (**self).get_info(key)
    }

    fn remove(&mut self, key: &str) -> KvResult<()> {
        (**self).remove(key)
    }

    fn iterator_open(&mut self, prefix: Option<&str>) -> KvResult<KvIterator> {
        (**self).iterator_open(prefix)
    }

    fn iterator_next(&mut self, it: &mut KvIterator, max_key_size: usize) -> KvResult<String> {
        (**self).iterator_next(it, max_key_size)
    }

    fn iterator_close(&mut self, it: KvIterator) -> KvResult<()> {
        (**self).iterator_close(it)
    }
}

/// Shared `iterator_next` behaviour for snapshot-based stores.
///
/// Exhaustion is terminal: once `NotFound` is returned the snapshot stays
/// empty.
pub fn next_from_snapshot(it: &mut KvIterator, max_key_size: usize) -> KvResult<String> {
    let required = match it.peek() {
        Some(key) => key.len(),
        None => return Err(KvError::NotFound),
    };
    if required > max_key_size {
        return Err(KvError::BufferTooSmall {
            required,
            provided: max_key_size,
        });
    }
    it.advance().ok_or(KvError::NotFound)
}
