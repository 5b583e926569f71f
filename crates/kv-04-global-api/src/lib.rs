//! # Global KV API (kv-04)
//!
//! Path-addressed access to any number of registered stores.
//!
//! ```text
//!   kv_set("/kv/example_key", ..)          kv_set("/secure/token", ..)
//!              │                                     │
//!              ▼                                     ▼
//!   ┌─────────────────────────── KvRegistry ───────────────────────────┐
//!   │  "kv"     ──► Mutex<TdbStore>                                     │
//!   │  "secure" ──► Mutex<SecureStore<TdbStore, TdbStore>>              │
//!   └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A path without a leading `/` goes to the default partition (the first
//! one registered unless changed with `set_default`). Each store sits
//! behind its own lock, so one registry can be shared across threads.
//!
//! ## Crate Structure
//!
//! - `domain/path` - `/<partition>/<key>` parsing
//! - `domain/iterator` - `GlobalIterator` handle
//! - `service/` - `KvRegistry`

pub mod domain;
pub mod service;

pub use domain::iterator::GlobalIterator;
pub use domain::path::KvPath;
pub use service::{DynStore, KvRegistry, SharedStore};
