//! # KV Registry Tests

use super::*;
use kv_01_block_device::HeapBlockDevice;
use kv_02_tdb_store::{TdbConfig, TdbStore};
use std::collections::HashSet;

fn tdb() -> TdbStore<HeapBlockDevice> {
    TdbStore::new(
        HeapBlockDevice::new(8 * 4096, 1, 1, 4096),
        TdbConfig::default().with_auto_format(true),
    )
}

fn registry(partitions: &[&str]) -> KvRegistry {
    let mut registry = KvRegistry::new();
    for name in partitions {
        registry.register(name, tdb()).unwrap();
    }
    registry.init_all().unwrap();
    registry
}

fn drain(registry: &KvRegistry, it: &mut GlobalIterator) -> HashSet<String> {
    let mut keys = HashSet::new();
    loop {
        match registry.kv_iterator_next(it, 64) {
            Ok(key) => assert!(keys.insert(key)),
            Err(KvError::NotFound) => break,
            Err(e) => panic!("iterator: {e}"),
        }
    }
    keys
}

/// Records every lifecycle call into a shared log.
struct Probe {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
    fail_init: bool,
}

impl KeyValueStore for Probe {
    fn init(&mut self) -> KvResult<()> {
        self.log.lock().push(format!("init {}", self.name));
        if self.fail_init {
            return Err(KvError::DeviceIo {
                message: "probe".into(),
            });
        }
        Ok(())
    }

    fn deinit(&mut self) -> KvResult<()> {
        self.log.lock().push(format!("deinit {}", self.name));
        Ok(())
    }

    fn reset(&mut self) -> KvResult<()> {
        Ok(())
    }

    fn set(&mut self, _: &str, _: &[u8], _: KvFlags) -> KvResult<()> {
        Ok(())
    }

    fn get(&mut self, _: &str, _: usize) -> KvResult<Vec<u8>> {
        Err(KvError::NotFound)
    }

    fn get_info(&mut self, _: &str) -> KvResult<KvInfo> {
        Err(KvError::NotFound)
    }

    fn remove(&mut self, _: &str) -> KvResult<()> {
        Err(KvError::NotFound)
    }

    fn iterator_open(&mut self, _: Option<&str>) -> KvResult<shared_types::KvIterator> {
        Ok(shared_types::KvIterator::new(1, Vec::new()))
    }

    fn iterator_next(
        &mut self,
        it: &mut shared_types::KvIterator,
        max_key_size: usize,
    ) -> KvResult<String> {
        shared_types::next_from_snapshot(it, max_key_size)
    }

    fn iterator_close(&mut self, _: shared_types::KvIterator) -> KvResult<()> {
        Ok(())
    }
}

// =============================================================================
// REGISTRATION AND LIFECYCLE
// =============================================================================

#[test]
fn test_first_partition_is_default() {
    let mut registry = registry(&["kv", "other"]);
    assert_eq!(registry.default_partition(), Some("kv"));
    assert_eq!(registry.partitions(), ["kv".to_string(), "other".to_string()]);

    registry.set_default("other").unwrap();
    registry.kv_set("bare", b"v", KvFlags::NONE).unwrap();
    assert_eq!(registry.kv_get("/other/bare", 8).unwrap(), b"v");
    assert_eq!(registry.kv_get("/kv/bare", 8), Err(KvError::NotFound));

    assert_eq!(registry.set_default("missing"), Err(KvError::NotFound));
}

#[test]
fn test_register_rejects_duplicates_and_bad_names() {
    let mut registry = KvRegistry::new();
    registry.register("kv", tdb()).unwrap();
    assert!(matches!(
        registry.register("kv", tdb()),
        Err(KvError::InvalidArgument { .. })
    ));
    assert!(matches!(
        registry.register("a/b", tdb()),
        Err(KvError::InvalidArgument { .. })
    ));
    assert!(matches!(
        registry.register("", tdb()),
        Err(KvError::InvalidArgument { .. })
    ));
}

#[test]
fn test_lifecycle_ordering() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = KvRegistry::new();
    for name in ["a", "b", "c"] {
        registry
            .register(
                name,
                Probe {
                    name,
                    log: Arc::clone(&log),
                    fail_init: false,
                },
            )
            .unwrap();
    }
    registry.init_all().unwrap();
    registry.deinit_all().unwrap();
    assert_eq!(
        *log.lock(),
        ["init a", "init b", "init c", "deinit c", "deinit b", "deinit a"]
    );
}

#[test]
fn test_init_failure_unwinds_started_partitions() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = KvRegistry::new();
    for (name, fail_init) in [("a", false), ("b", true), ("c", false)] {
        registry
            .register(
                name,
                Probe {
                    name,
                    log: Arc::clone(&log),
                    fail_init,
                },
            )
            .unwrap();
    }
    assert!(matches!(
        registry.init_all(),
        Err(KvError::DeviceIo { .. })
    ));
    assert_eq!(*log.lock(), ["init a", "init b", "deinit a"]);
}

#[test]
fn test_empty_registry_reports_not_found() {
    let registry = KvRegistry::new();
    assert_eq!(registry.kv_get("key", 8), Err(KvError::NotFound));
    assert!(matches!(
        registry.kv_iterator_open(None),
        Err(KvError::NotFound)
    ));
}

// =============================================================================
// PATH ROUTING
// =============================================================================

#[test]
fn test_partitions_are_isolated() {
    let registry = registry(&["kv", "other"]);
    registry.kv_set("/kv/key", b"one", KvFlags::NONE).unwrap();
    registry.kv_set("/other/key", b"two", KvFlags::NONE).unwrap();

    assert_eq!(registry.kv_get("/kv/key", 8).unwrap(), b"one");
    assert_eq!(registry.kv_get("key", 8).unwrap(), b"one");
    assert_eq!(registry.kv_get("/other/key", 8).unwrap(), b"two");

    registry.kv_reset("/other/").unwrap();
    assert_eq!(registry.kv_get("/other/key", 8), Err(KvError::NotFound));
    assert_eq!(registry.kv_get("/kv/key", 8).unwrap(), b"one");
}

#[test]
fn test_unknown_partition_and_malformed_paths() {
    let registry = registry(&["kv"]);
    assert_eq!(
        registry.kv_set("/nope/key", b"v", KvFlags::NONE),
        Err(KvError::NotFound)
    );
    assert!(matches!(
        registry.kv_set("/kv/", b"v", KvFlags::NONE),
        Err(KvError::InvalidArgument { .. })
    ));
    assert!(matches!(
        registry.kv_get("//key", 8),
        Err(KvError::InvalidArgument { .. })
    ));
    assert!(matches!(
        registry.kv_reset("/kv/key"),
        Err(KvError::InvalidArgument { .. })
    ));
    assert!(matches!(
        registry.kv_set("/kv/a/b", b"v", KvFlags::NONE),
        Err(KvError::InvalidArgument { .. })
    ));
}

#[test]
fn test_get_info_and_get_into() {
    let registry = registry(&["kv"]);
    registry
        .kv_set("/kv/wo", b"wo_value", KvFlags::WRITE_ONCE)
        .unwrap();

    let info = registry.kv_get_info("/kv/wo").unwrap();
    assert_eq!(info.size, 8);
    assert_eq!(info.flags, KvFlags::WRITE_ONCE);

    let mut buf = [0u8; 16];
    assert_eq!(registry.kv_get_into("/kv/wo", &mut buf).unwrap(), 8);
    assert_eq!(&buf[..8], b"wo_value");
    assert_eq!(registry.kv_remove("/kv/wo"), Err(KvError::WriteProtected));
}

#[test]
fn test_iteration_by_path_prefix() {
    let registry = registry(&["kv", "other"]);
    for key in ["dummy_a", "dummy_b", "real_a"] {
        registry
            .kv_set(&format!("/kv/{key}"), b"x", KvFlags::NONE)
            .unwrap();
    }
    registry.kv_set("/other/dummy_c", b"x", KvFlags::NONE).unwrap();

    let mut it = registry.kv_iterator_open(Some("/kv/dummy")).unwrap();
    assert_eq!(it.partition(), "kv");
    let keys = drain(&registry, &mut it);
    registry.kv_iterator_close(it).unwrap();
    assert_eq!(
        keys,
        HashSet::from(["dummy_a".to_string(), "dummy_b".to_string()])
    );

    let mut all = registry.kv_iterator_open(None).unwrap();
    assert_eq!(drain(&registry, &mut all).len(), 3);
    registry.kv_iterator_close(all).unwrap();

    let mut whole = registry.kv_iterator_open(Some("/other/")).unwrap();
    assert_eq!(
        drain(&registry, &mut whole),
        HashSet::from(["dummy_c".to_string()])
    );
    registry.kv_iterator_close(whole).unwrap();
}

#[test]
fn test_registry_is_shared_across_threads() {
    let registry = Arc::new(registry(&["kv"]));
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                for i in 0..20 {
                    let path = format!("/kv/t{t}_{i}");
                    registry.kv_set(&path, &[t as u8; 16], KvFlags::NONE).unwrap();
                    assert_eq!(registry.kv_get(&path, 16).unwrap(), vec![t as u8; 16]);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut it = registry.kv_iterator_open(Some("/kv/")).unwrap();
    assert_eq!(drain(&registry, &mut it).len(), 80);
    registry.kv_iterator_close(it).unwrap();
}
