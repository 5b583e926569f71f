//! # KV Registry
//!
//! Routes `/<partition>/<key>` paths to registered stores and owns their
//! lifecycle. Replaces a process-wide default store with an explicit
//! object the application constructs and tears down.
//!
//! ## Ordering
//!
//! - `init_all` brings partitions up in registration order.
//! - `deinit_all` takes them down in reverse.

#[cfg(test)]
mod tests;

use crate::domain::iterator::GlobalIterator;
use crate::domain::path::{validate_partition, KvPath};
use parking_lot::Mutex;
use shared_types::{KeyValueStore, KvError, KvFlags, KvInfo, KvResult};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A store as held by the registry.
pub type DynStore = Box<dyn KeyValueStore + Send>;

/// Handle to one partition's store. Every call goes through its lock.
pub type SharedStore = Arc<Mutex<DynStore>>;

/// Partition table plus the default partition.
#[derive(Default)]
pub struct KvRegistry {
    partitions: HashMap<String, SharedStore>,
    /// Registration order.
    order: Vec<String>,
    default: Option<String>,
}

impl KvRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `store` under `partition`. The first partition registered
    /// becomes the default.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a malformed or already registered name.
    pub fn register<S>(&mut self, partition: &str, store: S) -> KvResult<()>
    where
        S: KeyValueStore + Send + 'static,
    {
        validate_partition(partition)?;
        if self.partitions.contains_key(partition) {
            return Err(KvError::InvalidArgument {
                reason: format!("partition {:?} is already registered", partition),
            });
        }

        let store: DynStore = Box::new(store);
        self.partitions
            .insert(partition.to_string(), Arc::new(Mutex::new(store)));
        self.order.push(partition.to_string());
        if self.default.is_none() {
            self.default = Some(partition.to_string());
        }
        info!("[kv-04] Registered partition /{}/", partition);
        Ok(())
    }

    /// Route bare keys to `partition`.
    pub fn set_default(&mut self, partition: &str) -> KvResult<()> {
        if !self.partitions.contains_key(partition) {
            return Err(KvError::NotFound);
        }
        self.default = Some(partition.to_string());
        Ok(())
    }

    pub fn default_partition(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Partition names in registration order.
    pub fn partitions(&self) -> &[String] {
        &self.order
    }

    /// The store behind `partition`, for calls outside the path API.
    pub fn store(&self, partition: &str) -> Option<SharedStore> {
        self.partitions.get(partition).map(Arc::clone)
    }

    /// `init` every partition in registration order.
    ///
    /// On failure the partitions already brought up are taken down again
    /// and the first error is returned.
    pub fn init_all(&self) -> KvResult<()> {
        for (i, name) in self.order.iter().enumerate() {
            let store = self.named(name)?;
            let result = store.lock().init();
            if let Err(e) = result {
                warn!("[kv-04] Partition /{}/ failed to initialize: {}", name, e);
                for done in self.order[..i].iter().rev() {
                    let _ = self.named(done)?.lock().deinit();
                }
                return Err(e);
            }
            info!("[kv-04] Partition /{}/ initialized", name);
        }
        Ok(())
    }

    /// `deinit` every partition in reverse registration order. All
    /// partitions are visited; the first error is returned.
    pub fn deinit_all(&self) -> KvResult<()> {
        let mut first_error = None;
        for name in self.order.iter().rev() {
            let store = self.named(name)?;
            let result = store.lock().deinit();
            if let Err(e) = result {
                warn!("[kv-04] Partition /{}/ failed to deinitialize: {}", name, e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub fn kv_set(&self, path: &str, value: &[u8], flags: KvFlags) -> KvResult<()> {
        let p = KvPath::parse_key(path)?;
        debug!("[kv-04] kv_set {}", path);
        self.lookup(p.partition)?.lock().set(p.key, value, flags)
    }

    pub fn kv_get(&self, path: &str, max_size: usize) -> KvResult<Vec<u8>> {
        let p = KvPath::parse_key(path)?;
        self.lookup(p.partition)?.lock().get(p.key, max_size)
    }

    /// Read into `buf`, returning the actual size.
    pub fn kv_get_into(&self, path: &str, buf: &mut [u8]) -> KvResult<usize> {
        let p = KvPath::parse_key(path)?;
        self.lookup(p.partition)?.lock().get_into(p.key, buf)
    }

    pub fn kv_get_info(&self, path: &str) -> KvResult<KvInfo> {
        let p = KvPath::parse_key(path)?;
        self.lookup(p.partition)?.lock().get_info(p.key)
    }

    pub fn kv_remove(&self, path: &str) -> KvResult<()> {
        let p = KvPath::parse_key(path)?;
        debug!("[kv-04] kv_remove {}", path);
        self.lookup(p.partition)?.lock().remove(p.key)
    }

    /// Reset a whole partition. `path` is `/<partition>/`.
    pub fn kv_reset(&self, path: &str) -> KvResult<()> {
        let p = KvPath::parse(path)?;
        if !p.key.is_empty() {
            return Err(KvError::InvalidArgument {
                reason: format!("kv_reset takes a partition path, got {:?}", path),
            });
        }
        self.lookup(p.partition)?.lock().reset()?;
        info!("[kv-04] Partition {} reset", path);
        Ok(())
    }

    /// Open an iterator. `path` is `/<partition>/<prefix>`; `None` lists
    /// every key of the default partition.
    pub fn kv_iterator_open(&self, path: Option<&str>) -> KvResult<GlobalIterator> {
        let (partition, prefix) = match path {
            Some(path) => {
                let p = KvPath::parse(path)?;
                (p.partition, p.prefix())
            }
            None => (None, None),
        };
        let name = self.resolve(partition)?.to_string();
        let inner = self.named(&name)?.lock().iterator_open(prefix)?;
        Ok(GlobalIterator {
            partition: name,
            inner,
        })
    }

    pub fn kv_iterator_next(&self, it: &mut GlobalIterator, max_key_size: usize) -> KvResult<String> {
        self.named(&it.partition)?
            .lock()
            .iterator_next(&mut it.inner, max_key_size)
    }

    pub fn kv_iterator_close(&self, it: GlobalIterator) -> KvResult<()> {
        self.named(&it.partition)?
            .lock()
            .iterator_close(it.inner)
    }

    fn resolve<'a>(&'a self, partition: Option<&'a str>) -> KvResult<&'a str> {
        match partition {
            Some(name) => Ok(name),
            None => self.default.as_deref().ok_or(KvError::NotFound),
        }
    }

    fn lookup(&self, partition: Option<&str>) -> KvResult<&SharedStore> {
        self.named(self.resolve(partition)?)
    }

    fn named(&self, partition: &str) -> KvResult<&SharedStore> {
        self.partitions.get(partition).ok_or(KvError::NotFound)
    }
}
