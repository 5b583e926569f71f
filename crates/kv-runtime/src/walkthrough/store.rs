use super::{Transcript, EXAMPLE_KEY_LENGTH, EXAMPLE_VALUE_LENGTH};
use shared_types::{KeyValueStore, KvFlags};

const KEY: &str = "example_key";
const VALUE: &[u8] = b"kv_store_example_value_hello_world";

/// The full store session: reset, write-once and secured keys, info,
/// iteration, removal and the final reset.
pub fn store_walkthrough<S: KeyValueStore + ?Sized>(store: &mut S, name: &str) -> Transcript {
    let mut t = Transcript::new(format!("{} store API walk-through", name));
    let op = |what: &str| format!("{}_store->{}", name, what);

    let _ = t.step(op("init"), store.init());
    let _ = t.step(op("reset"), store.reset());

    t.note("get from empty store - should fail!");
    let _ = t.step(op("get"), store.get(KEY, EXAMPLE_VALUE_LENGTH));

    let _ = t.step(op("set"), store.set(KEY, VALUE, KvFlags::NONE));
    let _ = t.step(op("set"), store.set("wo_key", b"wo_value", KvFlags::WRITE_ONCE));

    // A plain store keeps the security flags without enforcing them.
    let secured = KvFlags::SECURITY_MASK;
    let _ = t.step(op("set"), store.set("auth_enc_key", b"auth_enc_value", secured));

    if let Ok(value) = t.step(op("get"), store.get(KEY, EXAMPLE_VALUE_LENGTH)) {
        t.note(format!("get key: {}", KEY));
        t.note(format!("get value: {}", String::from_utf8_lossy(&value)));
    }

    if let Ok(info) = t.step(op("get_info"), store.get_info(KEY)) {
        t.note(format!("get_info info - size: {}, flags: {}", info.size, info.flags.bits()));
    }

    t.note("Iterating Existing Keys");
    if let Ok(mut it) = t.step(op("iterator_open"), store.iterator_open(None)) {
        let mut index = 0;
        while let Ok(key) = store.iterator_next(&mut it, EXAMPLE_KEY_LENGTH) {
            index += 1;
            t.note(format!("{}) {}", index, key));
        }
        let _ = t.step(op("iterator_close"), store.iterator_close(it));
    }

    let _ = t.step(op("remove"), store.remove(KEY));
    t.note("get first key after removing it - should fail!");
    let _ = t.step(op("get"), store.get(KEY, EXAMPLE_VALUE_LENGTH));

    t.note("remove write-once key - should fail!");
    let _ = t.step(op("remove"), store.remove("wo_key"));
    if let Ok(value) = t.step(op("get"), store.get("wo_key", EXAMPLE_VALUE_LENGTH)) {
        t.note(format!("get value: {}", String::from_utf8_lossy(&value)));
    }

    t.note("reset will format the store (including write-once)");
    let _ = t.step(op("reset"), store.reset());
    t.note("get write-once key after reset - should fail!");
    let _ = t.step(op("get"), store.get("wo_key", EXAMPLE_VALUE_LENGTH));

    let _ = t.step(op("deinit"), store.deinit());
    t
}
