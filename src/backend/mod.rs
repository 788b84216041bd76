//! String key-value storage backends
//!
//! The store never owns storage itself: it talks to two injected backends
//! through [`StorageBackend`], one persistent and one session-scoped, and
//! picks between them per call via [`BackendKind`].

mod file;
mod memory;
#[cfg(all(feature = "csr", target_arch = "wasm32"))]
mod web;

pub use file::FileBackend;
pub use memory::MemoryBackend;
#[cfg(all(feature = "csr", target_arch = "wasm32"))]
pub use web::WebStorage;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;

use crate::error::BackendError;

/// Synchronous string-keyed storage, shaped after the browser `Storage` API.
pub trait StorageBackend: Send + Sync {
  /// Short label used in logs and errors
  fn name(&self) -> &str;

  fn get_item(&self, key: &str) -> Option<String>;

  /// Write a value. May fail when the backend is full or unavailable.
  fn set_item(&self, key: &str, value: &str) -> Result<(), BackendError>;

  /// Remove a value. Removing a missing key is a no-op.
  fn remove_item(&self, key: &str);

  fn clear(&self);

  /// Snapshot of every key currently stored
  fn keys(&self) -> Vec<String>;

  fn len(&self) -> usize {
    self.keys().len()
  }

  fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// Which of the two backends an operation targets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BackendKind {
  /// Survives restarts (`localStorage` in a browser, a data file natively)
  #[default]
  Persistent,
  /// Lives as long as the session (`sessionStorage`, or process memory)
  Session,
}

impl BackendKind {
  /// Resolve a user-facing alias.
  ///
  /// `l`, `local`, `localstorage` and `persistent` (any case) select the
  /// persistent backend. Anything else, typos included, selects the session
  /// backend.
  pub fn from_alias(alias: &str) -> Self {
    match alias.trim().to_lowercase().as_str() {
      "l" | "local" | "localstorage" | "persistent" => BackendKind::Persistent,
      _ => BackendKind::Session,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      BackendKind::Persistent => "local",
      BackendKind::Session => "session",
    }
  }
}

impl std::fmt::Display for BackendKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl std::str::FromStr for BackendKind {
  type Err = std::convert::Infallible;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(BackendKind::from_alias(s))
  }
}

impl Serialize for BackendKind {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(self.as_str())
  }
}

impl<'de> Deserialize<'de> for BackendKind {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    // Anything that is not a string can never name the persistent backend
    Ok(match serde_json::Value::deserialize(deserializer)? {
      serde_json::Value::String(alias) => BackendKind::from_alias(&alias),
      _ => BackendKind::Session,
    })
  }
}

/// The pair of backends a store routes between
#[derive(Clone)]
pub struct Backends {
  persistent: Arc<dyn StorageBackend>,
  session: Arc<dyn StorageBackend>,
}

impl Backends {
  pub fn new(persistent: Arc<dyn StorageBackend>, session: Arc<dyn StorageBackend>) -> Self {
    Self {
      persistent,
      session,
    }
  }

  /// Two unbounded in-memory backends
  pub fn in_memory() -> Self {
    Self::new(
      Arc::new(MemoryBackend::new("local")),
      Arc::new(MemoryBackend::new("session")),
    )
  }

  /// `window.localStorage` and `window.sessionStorage`
  #[cfg(all(feature = "csr", target_arch = "wasm32"))]
  pub fn browser() -> Self {
    Self::new(Arc::new(WebStorage::local()), Arc::new(WebStorage::session()))
  }

  pub fn select(&self, kind: BackendKind) -> &Arc<dyn StorageBackend> {
    match kind {
      BackendKind::Persistent => &self.persistent,
      BackendKind::Session => &self.session,
    }
  }

  pub fn persistent(&self) -> &Arc<dyn StorageBackend> {
    &self.persistent
  }

  pub fn session(&self) -> &Arc<dyn StorageBackend> {
    &self.session
  }

  /// Both backends, persistent first
  pub fn all(&self) -> [(BackendKind, &Arc<dyn StorageBackend>); 2] {
    [
      (BackendKind::Persistent, &self.persistent),
      (BackendKind::Session, &self.session),
    ]
  }
}

impl std::fmt::Debug for Backends {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Backends")
      .field("persistent", &self.persistent.name())
      .field("session", &self.session.name())
      .finish()
  }
}
