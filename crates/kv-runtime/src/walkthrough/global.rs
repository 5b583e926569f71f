use super::{Transcript, EXAMPLE_KEY_LENGTH, EXAMPLE_VALUE_LENGTH};
use kv_04_global_api::KvRegistry;
use shared_types::KvFlags;

const KEY: &str = "/kv/example_key";
const VALUE: &[u8] = b"kvstore_example_value_hello_world";

/// The path-addressed session against an initialized registry.
pub fn global_walkthrough(registry: &KvRegistry) -> Transcript {
    let mut t = Transcript::new("global API walk-through");

    let _ = t.step("kv_reset", registry.kv_reset("/kv/"));
    t.note("kv_get from empty store - should fail!");
    let _ = t.step("kv_get", registry.kv_get(KEY, EXAMPLE_VALUE_LENGTH));

    let _ = t.step("kv_set", registry.kv_set(KEY, VALUE, KvFlags::NONE));
    let _ = t.step(
        "kv_set",
        registry.kv_set("/kv/wo_key", b"wo_value", KvFlags::WRITE_ONCE),
    );

    let secured = KvFlags::SECURITY_MASK;
    let _ = t.step("kv_reset", registry.kv_reset("/secure/"));
    let _ = t.step(
        "kv_set",
        registry.kv_set("/secure/auth_enc_key", b"auth_enc_value", secured),
    );
    if let Ok(value) = t.step(
        "kv_get",
        registry.kv_get("/secure/auth_enc_key", EXAMPLE_VALUE_LENGTH),
    ) {
        t.note(format!(
            "kv_get /secure/auth_enc_key value: {}",
            String::from_utf8_lossy(&value)
        ));
    }

    if let Ok(value) = t.step("kv_get", registry.kv_get(KEY, EXAMPLE_VALUE_LENGTH)) {
        t.note(format!("kv_get key: {}", KEY));
        t.note(format!("kv_get value: {}", String::from_utf8_lossy(&value)));
    }
    if let Ok(info) = t.step("kv_get_info", registry.kv_get_info(KEY)) {
        t.note(format!(
            "kv_get_info info - size: {}, flags: {}",
            info.size,
            info.flags.bits()
        ));
    }

    t.note("Iterating Existing Keys");
    if let Ok(mut it) = t.step("kv_iterator_open", registry.kv_iterator_open(None)) {
        let mut index = 0;
        while let Ok(key) = registry.kv_iterator_next(&mut it, EXAMPLE_KEY_LENGTH) {
            index += 1;
            t.note(format!("{}) {}", index, key));
        }
        let _ = t.step("kv_iterator_close", registry.kv_iterator_close(it));
    }

    let _ = t.step("kv_remove", registry.kv_remove(KEY));
    t.note("kv_get first key after removing it - should fail!");
    let _ = t.step("kv_get", registry.kv_get(KEY, EXAMPLE_VALUE_LENGTH));

    t.note("kv_remove write-once key - should fail!");
    let _ = t.step("kv_remove", registry.kv_remove("/kv/wo_key"));
    if let Ok(value) = t.step("kv_get", registry.kv_get("/kv/wo_key", EXAMPLE_VALUE_LENGTH)) {
        t.note(format!("kv_get value: {}", String::from_utf8_lossy(&value)));
    }

    t.note("kv_reset will format the store (including write-once)");
    let _ = t.step("kv_reset", registry.kv_reset("/kv/"));
    t.note("kv_get write-once key after reset - should fail!");
    let _ = t.step("kv_get", registry.kv_get("/kv/wo_key", EXAMPLE_VALUE_LENGTH));
    t
}
