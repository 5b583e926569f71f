//! # Secure Store (kv-03)
//!
//! Per-key confidentiality, integrity and replay protection, composed from
//! two plain key-value stores:
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!   set/get ────► │         SecureStore          │
//!                 └──────┬────────────────┬──────┘
//!                        │ envelope       │ counter (u64 LE)
//!                        ▼                ▼
//!                 ┌────────────┐   ┌──────────────────────────┐
//!                 │ Data Store │   │ Rollback-Protection Store│
//!                 └────────────┘   └──────────────────────────┘
//! ```
//!
//! ## Write Order
//!
//! `set` writes the envelope to the Data Store first and then commits the
//! counter. An interruption between the two leaves the embedded counter
//! exactly one ahead of the committed one, which `get` accepts and `init`
//! rolls forward. Any other mismatch is reported as
//! `AuthenticationFailed`.
//!
//! ## Crate Structure
//!
//! - `domain/envelope` - Envelope header codec, seal and open
//! - `domain/counter` - Rollback counter encoding and freshness rules
//! - `domain/config` - `SecureStoreConfig`
//! - `domain/reconcile` - `ReconcileReport` produced by `init`
//! - `service/` - `SecureStore`, implementing `shared_types::KeyValueStore`

pub mod domain;
pub mod service;

pub use domain::config::SecureStoreConfig;
pub use domain::counter::Freshness;
pub use domain::envelope::{Envelope, EnvelopeError, EnvelopeHeader, ENVELOPE_HEADER_SIZE};
pub use domain::reconcile::ReconcileReport;
pub use service::SecureStore;
