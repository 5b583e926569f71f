//! Model-based test: random operation sequences against a `HashMap`.

use kv_01_block_device::HeapBlockDevice;
use kv_02_tdb_store::{TdbConfig, TdbStore};
use proptest::prelude::*;
use shared_types::{KeyValueStore, KvError, KvFlags};
use std::collections::HashMap;

const KEYS: [&str; 6] = ["k0", "k1", "k2", "k3", "k4", "k5"];

#[derive(Debug, Clone)]
enum Op {
    Set(usize, Vec<u8>),
    Remove(usize),
    Reopen,
    Compact,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (0..KEYS.len(), prop::collection::vec(any::<u8>(), 0..160))
            .prop_map(|(k, v)| Op::Set(k, v)),
        3 => (0..KEYS.len()).prop_map(Op::Remove),
        1 => Just(Op::Reopen),
        1 => Just(Op::Compact),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn store_matches_model(ops in prop::collection::vec(op_strategy(), 1..120)) {
        let mut store = TdbStore::new(
            HeapBlockDevice::new(4096, 1, 1, 1024),
            TdbConfig::default().with_auto_format(true),
        );
        store.init().unwrap();
        let mut model: HashMap<&str, Vec<u8>> = HashMap::new();

        for op in ops {
            match op {
                Op::Set(k, value) => match store.set(KEYS[k], &value, KvFlags::NONE) {
                    Ok(()) => {
                        model.insert(KEYS[k], value);
                    }
                    Err(KvError::MediaFull { .. }) => {}
                    Err(e) => panic!("set failed: {e}"),
                },
                Op::Remove(k) => {
                    let expected = if model.remove(KEYS[k]).is_some() {
                        Ok(())
                    } else {
                        Err(KvError::NotFound)
                    };
                    prop_assert_eq!(store.remove(KEYS[k]), expected);
                }
                Op::Reopen => {
                    store.deinit().unwrap();
                    store.init().unwrap();
                    prop_assert!(store.recovery_report().is_clean());
                }
                Op::Compact => store.compact().unwrap(),
            }

            for key in KEYS {
                match model.get(key) {
                    Some(value) => prop_assert_eq!(&store.get(key, 4096).unwrap(), value),
                    None => prop_assert_eq!(store.get(key, 4096), Err(KvError::NotFound)),
                }
            }
            prop_assert_eq!(store.len(), model.len());
        }
    }
}
