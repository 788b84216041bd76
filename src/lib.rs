//! # webstash
//!
//! Namespaced, TTL-aware key-value storage over a persistent and a
//! session-scoped string backend, shaped after the browser's
//! `localStorage`/`sessionStorage` pair.
//!
//! - Values are any JSON value; strict mode stores them in a self-describing
//!   envelope so `"42"` and `42` never get confused
//! - Expiry is checked on read, with no background sweep
//! - Backends are injected: in-memory, a JSON data file, or (with the `csr`
//!   feature on wasm32) the browser's own storage areas

pub mod backend;
pub mod clock;
pub mod codec;
pub mod config;
pub mod error;
pub mod namespace;
pub mod options;
pub mod store;

// Native binaries only
#[cfg(feature = "cli")]
pub mod logging;

pub use backend::{BackendKind, Backends, FileBackend, MemoryBackend, StorageBackend};
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{Envelope, TypeTag};
pub use config::StashConfig;
pub use error::{BackendError, Result, StashError};
pub use options::{ConfigResolver, Defaults, ResolvedOptions, StoreOptions};
pub use store::{EntryStore, Pair, StoreStats};

#[cfg(all(feature = "csr", target_arch = "wasm32"))]
pub use backend::WebStorage;
