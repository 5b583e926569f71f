//! The global API walk-through: a raw partition and a secured partition
//! sharing one flash device.

use kv_01_block_device::{HeapBlockDevice, SharedBlockDevice, SlicingBlockDevice};
use kv_02_tdb_store::{TdbConfig, TdbStore};
use kv_03_secure_store::{SecureStore, SecureStoreConfig};
use kv_04_global_api::KvRegistry;
use shared_crypto::SecretKey;
use shared_types::{KvError, KvFlags};

const ERASE: u64 = 4096;

fn registry() -> KvRegistry {
    let flash = SharedBlockDevice::new(HeapBlockDevice::new(20 * ERASE, 1, 1, ERASE));
    let slice = |from: u64, to: u64| {
        SlicingBlockDevice::new(flash.clone(), from * ERASE, to * ERASE).unwrap()
    };

    let mut registry = KvRegistry::new();
    registry
        .register("kv", TdbStore::new(slice(0, 8), TdbConfig::default()))
        .unwrap();
    registry
        .register(
            "secure",
            SecureStore::new(
                TdbStore::new(slice(8, 16), TdbConfig::default()),
                TdbStore::new(slice(16, 20), TdbConfig::default()),
                SecretKey::from_bytes([9u8; 32]),
                SecureStoreConfig::default(),
            ),
        )
        .unwrap();
    registry.init_all().unwrap();
    registry
}

#[test]
fn test_walkthrough_on_blank_media() {
    let registry = registry();

    // Blank media: nothing works until the partition is reset.
    assert_eq!(registry.kv_get("/kv/example_key", 64), Err(KvError::NotReady));
    registry.kv_reset("/kv/").unwrap();
    assert_eq!(registry.kv_get("/kv/example_key", 64), Err(KvError::NotFound));

    let value = b"kvstore_example_value_hello_world";
    registry
        .kv_set("/kv/example_key", value, KvFlags::NONE)
        .unwrap();
    registry
        .kv_set("/kv/wo_key", b"wo_value", KvFlags::WRITE_ONCE)
        .unwrap();
    assert_eq!(registry.kv_get("/kv/example_key", 64).unwrap(), value);

    let info = registry.kv_get_info("/kv/example_key").unwrap();
    assert_eq!(info.size, value.len());
    assert_eq!(info.flags, KvFlags::NONE);

    let mut it = registry.kv_iterator_open(None).unwrap();
    let mut count = 0;
    while registry.kv_iterator_next(&mut it, 16).is_ok() {
        count += 1;
    }
    registry.kv_iterator_close(it).unwrap();
    assert_eq!(count, 2);

    registry.kv_remove("/kv/example_key").unwrap();
    assert_eq!(registry.kv_get("/kv/example_key", 64), Err(KvError::NotFound));

    assert_eq!(registry.kv_remove("/kv/wo_key"), Err(KvError::WriteProtected));
    assert_eq!(registry.kv_get("/kv/wo_key", 64).unwrap(), b"wo_value");

    registry.kv_reset("/kv/").unwrap();
    assert_eq!(registry.kv_get("/kv/wo_key", 64), Err(KvError::NotFound));

    registry.deinit_all().unwrap();
}

#[test]
fn test_secured_partition_behind_the_same_api() {
    let registry = registry();
    registry.kv_reset("/secure/").unwrap();

    let flags = KvFlags::SECURITY_MASK;
    registry
        .kv_set("/secure/auth_enc_key", b"auth_enc_value", flags)
        .unwrap();
    assert_eq!(
        registry.kv_get("/secure/auth_enc_key", 64).unwrap(),
        b"auth_enc_value"
    );
    assert_eq!(registry.kv_get_info("/secure/auth_enc_key").unwrap().size, 14);

    // The raw partition sits elsewhere on the device and is still blank.
    assert_eq!(registry.kv_get("/kv/auth_enc_key", 64), Err(KvError::NotReady));
}
