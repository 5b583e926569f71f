//! # Secure Store Service
//!
//! `SecureStore` wraps a Data Store and a Rollback-Protection Store, both
//! plain `KeyValueStore`s. Keys written without security flags pass
//! straight through to the Data Store.


use crate::domain::config::SecureStoreConfig;
use crate::domain::counter::{decode_counter, encode_counter, next_counter, Freshness, COUNTER_SIZE};
use crate::domain::envelope::{Envelope, EnvelopeError};
use crate::domain::reconcile::ReconcileReport;
use shared_crypto::SecretKey;
use shared_types::{validate_key, KeyValueStore, KvError, KvFlags, KvInfo, KvIterator, KvResult};

/// Authenticated, optionally encrypted and replay-protected store.
pub struct SecureStore<D: KeyValueStore, R: KeyValueStore> {
    data: D,
    rollback: R,
    secret: SecretKey,
    config: SecureStoreConfig,
    report: ReconcileReport,
}

impl<D: KeyValueStore, R: KeyValueStore> SecureStore<D, R> {
    /// Compose `data` and `rollback` under `secret`.
    pub fn new(data: D, rollback: R, secret: SecretKey, config: SecureStoreConfig) -> Self {
        Self {
            data,
            rollback,
            secret,
            config,
            report: ReconcileReport::new(),
        }
    }

    pub fn config(&self) -> &SecureStoreConfig {
        &self.config
    }

    /// Report from the last `init`.
    pub fn reconcile_report(&self) -> &ReconcileReport {
        &self.report
    }

    pub fn data_store(&self) -> &D {
        &self.data
    }

    pub fn data_store_mut(&mut self) -> &mut D {
        &mut self.data
    }

    pub fn rollback_store(&self) -> &R {
        &self.rollback
    }

    pub fn rollback_store_mut(&mut self) -> &mut R {
        &mut self.rollback
    }

    /// Release both stores.
    pub fn into_parts(self) -> (D, R) {
        (self.data, self.rollback)
    }

    fn committed_counter(&mut self, key: &str) -> KvResult<u64> {
        match self.rollback.get(key, COUNTER_SIZE) {
            Ok(raw) => decode_counter(&raw),
            Err(KvError::NotFound) => Ok(0),
            Err(KvError::BufferTooSmall { required, .. }) => Err(KvError::corrupted(format!(
                "rollback counter for {} is {} bytes",
                key, required
            ))),
            Err(e) => Err(e),
        }
    }

    /// Fetch and parse the envelope of a secured record.
    fn load_envelope(&mut self, key: &str, info: &KvInfo) -> KvResult<Envelope> {
        let raw = self.data.get(key, info.size)?;
        let envelope = Envelope::decode(&raw)?;
        if envelope.header.flags != info.flags.bits() {
            return Err(EnvelopeError::FlagMismatch {
                record: info.flags.bits(),
                envelope: envelope.header.flags,
            }
            .into());
        }
        Ok(envelope)
    }

    /// Verify a secured record end to end and return its plaintext.
    fn open_secured(&mut self, key: &str, info: &KvInfo) -> KvResult<Vec<u8>> {
        let envelope = self.load_envelope(key, info)?;

        if info.flags.contains(KvFlags::REQUIRE_REPLAY_PROTECTION) {
            let committed = self.committed_counter(key)?;
            let embedded = envelope.header.counter;
            match Freshness::classify(embedded, committed) {
                Freshness::Current | Freshness::PendingCommit => {}
                Freshness::Replayed => {
                    tracing::warn!(
                        "[kv-03] Replay detected for {}: envelope counter {} behind {}",
                        key,
                        embedded,
                        committed
                    );
                    return Err(KvError::auth_failed(format!(
                        "stale envelope for {}: counter {} behind {}",
                        key, embedded, committed
                    )));
                }
                Freshness::Ahead => {
                    tracing::warn!(
                        "[kv-03] Envelope counter {} for {} is ahead of committed {}",
                        embedded,
                        key,
                        committed
                    );
                    return Err(KvError::auth_failed(format!(
                        "envelope for {} claims counter {}, committed {}",
                        key, embedded, committed
                    )));
                }
            }
        }

        envelope.open(&self.secret, key).map_err(|e| {
            tracing::warn!("[kv-03] Authentication failed for {}: {}", key, e);
            KvError::from(e)
        })
    }

    /// Check every replay-protected key against its committed counter,
    /// completing interrupted commits.
    fn reconcile(&mut self) -> KvResult<ReconcileReport> {
        let mut report = ReconcileReport::new();
        let mut it = match self.data.iterator_open(None) {
            Ok(it) => it,
            Err(KvError::NotReady) => {
                report.skipped = true;
                return Ok(report);
            }
            Err(e) => return Err(e),
        };

        let mut keys = Vec::new();
        loop {
            match self.data.iterator_next(&mut it, shared_types::MAX_KEY_SIZE) {
                Ok(key) => keys.push(key),
                Err(KvError::NotFound) => break,
                Err(e) => {
                    self.data.iterator_close(it)?;
                    return Err(e);
                }
            }
        }
        self.data.iterator_close(it)?;

        for key in keys {
            let info = self.data.get_info(&key)?;
            if !info.flags.contains(KvFlags::REQUIRE_REPLAY_PROTECTION) {
                continue;
            }
            report.keys_checked += 1;

            let envelope = match self.load_envelope(&key, &info) {
                Ok(envelope) => envelope,
                Err(KvError::AuthenticationFailed { .. } | KvError::Corrupted { .. }) => {
                    report.unauthenticated.push(key);
                    continue;
                }
                Err(e) => return Err(e),
            };
            let committed = match self.committed_counter(&key) {
                Ok(committed) => committed,
                Err(KvError::NotReady) => {
                    tracing::warn!("[kv-03] Rollback store not formatted; counters left unchecked");
                    report.skipped = true;
                    return Ok(report);
                }
                Err(e) => return Err(e),
            };
            match Freshness::classify(envelope.header.counter, committed) {
                Freshness::Current => {}
                Freshness::PendingCommit => {
                    if envelope.open(&self.secret, &key).is_err() {
                        report.unauthenticated.push(key);
                        continue;
                    }
                    self.rollback.set(
                        &key,
                        &encode_counter(envelope.header.counter),
                        KvFlags::NONE,
                    )?;
                    tracing::info!(
                        "[kv-03] Completed interrupted counter commit for {} (counter {})",
                        key,
                        envelope.header.counter
                    );
                    report.rolled_forward.push(key);
                }
                Freshness::Replayed => report.replayed.push(key),
                Freshness::Ahead => report.counter_ahead.push(key),
            }
        }

        for key in report.unreadable() {
            tracing::warn!("[kv-03] {} fails verification and is unreadable", key);
        }
        Ok(report)
    }
}

impl<D: KeyValueStore, R: KeyValueStore> KeyValueStore for SecureStore<D, R> {
    fn init(&mut self) -> KvResult<()> {
        let data = self.data.init();
        let rollback = self.rollback.init();
        if let Err(e) = data.clone().and(rollback.clone()) {
            // A corrupted store stays faulted so `reset` can still reach it.
            let unwind = !matches!(e, KvError::Corrupted { .. });
            if unwind && data.is_ok() {
                let _ = self.data.deinit();
            }
            if unwind && rollback.is_ok() {
                let _ = self.rollback.deinit();
            }
            tracing::warn!("[kv-03] Secure store failed to initialize: {}", e);
            return Err(e);
        }

        if self.config.reconcile_on_init {
            match self.reconcile() {
                Ok(report) => self.report = report,
                Err(e) => {
                    let _ = self.deinit();
                    return Err(e);
                }
            }
        }
        tracing::info!(
            "[kv-03] Secure store initialized ({} replay-protected keys checked, {} rolled forward)",
            self.report.keys_checked,
            self.report.rolled_forward.len()
        );
        Ok(())
    }

    fn deinit(&mut self) -> KvResult<()> {
        let data = self.data.deinit();
        let rollback = self.rollback.deinit();
        data.and(rollback)
    }

    fn reset(&mut self) -> KvResult<()> {
        let data = self.data.reset();
        let rollback = self.rollback.reset();
        data.and(rollback)?;
        self.report = ReconcileReport::new();
        tracing::info!("[kv-03] Secure store reset (data and rollback counters cleared)");
        Ok(())
    }

    fn set(&mut self, key: &str, value: &[u8], flags: KvFlags) -> KvResult<()> {
        validate_key(key)?;
        if !flags.is_secured() {
            return self.data.set(key, value, flags);
        }

        let existing = match self.data.get_info(key) {
            Ok(info) => Some(info),
            Err(KvError::NotFound) => None,
            Err(e) => return Err(e),
        };
        if existing.is_some_and(|info| info.flags.is_write_once()) {
            return Err(KvError::WriteProtected);
        }

        let counter = if flags.contains(KvFlags::REQUIRE_REPLAY_PROTECTION) {
            let committed = self.committed_counter(key)?;
            let embedded = match existing {
                Some(info) if info.flags.contains(KvFlags::REQUIRE_REPLAY_PROTECTION) => self
                    .load_envelope(key, &info)
                    .ok()
                    .map(|envelope| envelope.header.counter),
                _ => None,
            };
            next_counter(committed, embedded)
        } else {
            0
        };

        let envelope = Envelope::seal(self.config.cipher, &self.secret, key, value, flags, counter)?;
        self.data.set(key, &envelope.encode()?, flags)?;

        if flags.contains(KvFlags::REQUIRE_REPLAY_PROTECTION) {
            self.rollback
                .set(key, &encode_counter(counter), KvFlags::NONE)?;
        }
        tracing::debug!(
            "[kv-03] Set {} ({} bytes, flags {}, counter {})",
            key,
            value.len(),
            flags,
            counter
        );
        Ok(())
    }

    fn get(&mut self, key: &str, max_size: usize) -> KvResult<Vec<u8>> {
        validate_key(key)?;
        let info = self.data.get_info(key)?;
        if !info.flags.is_secured() {
            return self.data.get(key, max_size);
        }

        let plaintext = self.open_secured(key, &info)?;
        if plaintext.len() > max_size {
            return Err(KvError::BufferTooSmall {
                required: plaintext.len(),
                provided: max_size,
            });
        }
        Ok(plaintext)
    }

    fn get_info(&mut self, key: &str) -> KvResult<KvInfo> {
        validate_key(key)?;
        let info = self.data.get_info(key)?;
        if !info.flags.is_secured() {
            return Ok(info);
        }

        let plaintext = self.open_secured(key, &info)?;
        Ok(KvInfo {
            size: plaintext.len(),
            flags: info.flags,
        })
    }

    fn remove(&mut self, key: &str) -> KvResult<()> {
        // The counter stays so a restored older envelope is still refused.
        self.data.remove(key)
    }

    fn iterator_open(&mut self, prefix: Option<&str>) -> KvResult<KvIterator> {
        self.data.iterator_open(prefix)
    }

    fn iterator_next(&mut self, it: &mut KvIterator, max_key_size: usize) -> KvResult<String> {
        self.data.iterator_next(it, max_key_size)
    }

    fn iterator_close(&mut self, it: KvIterator) -> KvResult<()> {
        self.data.iterator_close(it)
    }
}
