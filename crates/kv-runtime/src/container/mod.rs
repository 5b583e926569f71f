//! # Store Container
//!
//! Owns the backing device and hands out the stores built on its
//! partitions.
//!
//! ```text
//! ┌──────────── raw ────────────┬──────── secure data ────────┬─ rollback ─┐
//! │ TdbStore  (/kv/)            │ TdbStore  ┐                 │ TdbStore ┐ │
//! └─────────────────────────────┴───────────┼─────────────────┴──────────┼─┘
//!                                           └──── SecureStore (/secure/) ┘
//! ```

pub mod config;

pub use config::{CipherName, ConfigError, RuntimeConfig, SecurityConfig, StorageConfig};

use kv_01_block_device::{
    BlockDevice, FileBlockDevice, HeapBlockDevice, SharedBlockDevice, SlicingBlockDevice,
};
use kv_02_tdb_store::{TdbConfig, TdbStore};
use kv_03_secure_store::{SecureStore, SecureStoreConfig};
use kv_04_global_api::KvRegistry;
use shared_crypto::SecretKey;
use shared_types::KvResult;
use tracing::info;

/// Device under every partition.
pub type Backing = Box<dyn BlockDevice + Send>;
pub type Flash = SharedBlockDevice<Backing>;
pub type Partition = SlicingBlockDevice<Flash>;
pub type RawStore = TdbStore<Partition>;
pub type SecureKvStore = SecureStore<RawStore, RawStore>;

pub const RAW_PARTITION: &str = "kv";
pub const SECURE_PARTITION: &str = "secure";

/// Backing device plus the partition layout.
pub struct StoreContainer {
    pub config: RuntimeConfig,
    flash: Flash,
}

impl StoreContainer {
    /// Open the device named by the config: the image file when one is
    /// set, an erased heap device otherwise.
    pub fn open(config: RuntimeConfig) -> KvResult<Self> {
        let s = &config.storage;
        let backing: Backing = match &s.image {
            Some(path) => Box::new(FileBlockDevice::open(
                path,
                s.device_size(),
                s.program_size,
                s.erase_size,
            )?),
            None => Box::new(HeapBlockDevice::new(
                s.device_size(),
                1,
                s.program_size,
                s.erase_size,
            )),
        };
        Self::with_device(config, backing)
    }

    /// Use an already constructed device.
    pub fn with_device(config: RuntimeConfig, backing: Backing) -> KvResult<Self> {
        let mut flash = SharedBlockDevice::new(backing);
        flash.init()?;
        info!(
            "[kv-runtime] Device ready: {} bytes, erase unit {}",
            flash.size(),
            flash.erase_size()
        );
        Ok(Self { config, flash })
    }

    pub fn flash(&self) -> &Flash {
        &self.flash
    }

    /// A new store over the raw partition.
    pub fn raw_store(&self) -> KvResult<RawStore> {
        let (start, end) = self.extent(0, self.config.storage.raw_blocks);
        Ok(TdbStore::new(self.partition(start, end)?, self.tdb_config()))
    }

    /// A new secure store over the Data Store and Rollback-Protection
    /// partitions.
    pub fn secure_store(&self) -> KvResult<SecureKvStore> {
        let s = &self.config.storage;
        let (data_start, data_end) = self.extent(s.raw_blocks, s.secure_data_blocks);
        let (rbp_start, rbp_end) =
            self.extent(s.raw_blocks + s.secure_data_blocks, s.rollback_blocks);

        Ok(SecureStore::new(
            TdbStore::new(self.partition(data_start, data_end)?, self.tdb_config()),
            TdbStore::new(self.partition(rbp_start, rbp_end)?, self.tdb_config()),
            SecretKey::from_bytes(self.config.security.device_key),
            SecureStoreConfig::default().with_cipher(self.config.security.cipher.into()),
        ))
    }

    /// Registry with `/kv/` (default) and `/secure/` registered but not
    /// yet initialized.
    pub fn registry(&self) -> KvResult<KvRegistry> {
        let mut registry = KvRegistry::new();
        registry.register(RAW_PARTITION, self.raw_store()?)?;
        registry.register(SECURE_PARTITION, self.secure_store()?)?;
        Ok(registry)
    }

    fn tdb_config(&self) -> TdbConfig {
        TdbConfig::default().with_auto_format(self.config.storage.auto_format)
    }

    fn extent(&self, first_block: u64, blocks: u64) -> (u64, u64) {
        let erase = self.config.storage.erase_size;
        (first_block * erase, (first_block + blocks) * erase)
    }

    fn partition(&self, start: u64, end: u64) -> KvResult<Partition> {
        Ok(SlicingBlockDevice::new(self.flash.clone(), start, end)?)
    }
}
