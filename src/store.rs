//! The store facade
//!
//! Each operation resolves its options, derives the namespaced slot and the
//! target backend, then reads or writes the encoded entry. Expiry is lazy: an
//! expired entry stays in its backend until a `get` or `clear` touches it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::backend::{Backends, StorageBackend};
use crate::clock::{Clock, SystemClock};
use crate::codec::{decode_loose, decode_strict, encode_loose, encode_strict};
use crate::error::{Result, StashError};
use crate::namespace::{in_namespace, namespaced_key, strip_namespace};
use crate::options::{ConfigResolver, Defaults, ResolvedOptions, StoreOptions};

/// One element of a batch write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pair {
  pub key: String,
  /// `None` deletes the key; `Some(Value::Null)` stores a null
  #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
  pub value: Option<Value>,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<Value>, D::Error> {
  Value::deserialize(deserializer).map(Some)
}

impl Pair {
  pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
    Self {
      key: key.into(),
      value: Some(value.into()),
    }
  }

  /// A pair whose write deletes the key
  pub fn absent(key: impl Into<String>) -> Self {
    Self {
      key: key.into(),
      value: None,
    }
  }
}

/// Store counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
  pub hits: u64,
  pub misses: u64,
  /// Entries evicted on read because their expiry had passed
  pub expired: u64,
  /// Entries evicted on read because they failed to decode
  pub corrupt: u64,
  /// Entries deleted by a read-once `get`
  pub consumed: u64,
  pub writes: u64,
}

impl StoreStats {
  pub fn hit_rate(&self) -> f64 {
    let total = self.hits + self.misses;
    if total == 0 {
      0.0
    } else {
      self.hits as f64 / total as f64
    }
  }
}

#[derive(Default)]
struct Counters {
  hits: AtomicU64,
  misses: AtomicU64,
  expired: AtomicU64,
  corrupt: AtomicU64,
  consumed: AtomicU64,
  writes: AtomicU64,
}

fn bump(counter: &AtomicU64) {
  counter.fetch_add(1, Ordering::Relaxed);
}

/// Namespaced, TTL-aware key-value store over a persistent and a session backend.
///
/// ```rust
/// use serde_json::json;
/// use webstash::{Backends, EntryStore, StoreOptions};
///
/// let store = EntryStore::new(Backends::in_memory());
/// let opts = StoreOptions::new().namespace("app:").expire(60_000);
///
/// store.set("user", Some(json!({"name": "ada"})), &opts).unwrap();
/// assert_eq!(store.get("user", &opts), Some(json!({"name": "ada"})));
/// ```
pub struct EntryStore {
  backends: Backends,
  resolver: ConfigResolver,
  counters: Counters,
}

impl EntryStore {
  /// A store with the built-in defaults and the system clock
  pub fn new(backends: Backends) -> Self {
    Self::with_defaults(backends, Defaults::default())
  }

  pub fn with_defaults(backends: Backends, defaults: Defaults) -> Self {
    Self::with_clock(backends, defaults, Arc::new(SystemClock))
  }

  pub fn with_clock(backends: Backends, defaults: Defaults, clock: Arc<dyn Clock>) -> Self {
    Self {
      backends,
      resolver: ConfigResolver::new(defaults, clock),
      counters: Counters::default(),
    }
  }

  pub fn backends(&self) -> &Backends {
    &self.backends
  }

  pub fn resolver(&self) -> &ConfigResolver {
    &self.resolver
  }

  /// Read a value.
  ///
  /// Returns `None` for missing, expired and undecodable entries; the last
  /// two are deleted on the way out. With `read_once` a live entry is
  /// deleted after it has been read.
  pub fn get(&self, key: &str, options: &StoreOptions) -> Option<Value> {
    if key.is_empty() {
      tracing::warn!("Ignoring get: {}", StashError::InvalidArgument("key must not be empty".into()));
      return None;
    }

    let resolved = self.resolver.resolve(options);
    let slot = namespaced_key(key, &resolved);
    let backend = self.backends.select(resolved.backend);

    let Some(raw) = backend.get_item(&slot) else {
      bump(&self.counters.misses);
      tracing::warn!("Key '{}' not found in {} backend", slot, resolved.backend);
      return None;
    };

    let value = if resolved.strict {
      match decode_strict(&raw) {
        Ok(envelope) => {
          if envelope.is_expired(self.resolver.now_millis()) {
            backend.remove_item(&slot);
            bump(&self.counters.expired);
            tracing::debug!("Evicted expired key '{}' from {} backend", slot, resolved.backend);
            return None;
          }
          envelope.data
        }
        Err(e) => {
          backend.remove_item(&slot);
          bump(&self.counters.corrupt);
          let err = StashError::CorruptEntry {
            key: slot,
            reason: e.to_string(),
          };
          tracing::warn!("{}; entry evicted", err);
          return None;
        }
      }
    } else {
      decode_loose(&raw)
    };

    bump(&self.counters.hits);
    if resolved.read_once {
      backend.remove_item(&slot);
      bump(&self.counters.consumed);
      tracing::trace!("Consumed read-once key '{}'", slot);
    }
    Some(value)
  }

  /// [`get`](Self::get) followed by a typed conversion
  pub fn get_as<T: DeserializeOwned>(&self, key: &str, options: &StoreOptions) -> Result<Option<T>> {
    match self.get(key, options) {
      Some(value) => serde_json::from_value(value)
        .map(Some)
        .map_err(StashError::Deserialize),
      None => Ok(None),
    }
  }

  /// Write a value, replacing whatever the slot held.
  ///
  /// `None` deletes the key instead. Backend failures (a full quota, disabled
  /// storage) are returned as [`StashError::BackendWrite`].
  pub fn set(&self, key: &str, value: Option<Value>, options: &StoreOptions) -> Result<()> {
    let resolved = self.resolver.resolve(options);
    self.write(key, value.as_ref(), &resolved)
  }

  /// Serialize `value` and store it
  pub fn set_value<T: Serialize + ?Sized>(&self, key: &str, value: &T, options: &StoreOptions) -> Result<()> {
    let value = serde_json::to_value(value)?;
    self.set(key, Some(value), options)
  }

  /// Write several pairs under one set of resolved options.
  ///
  /// Writes happen in order; the first failure stops the batch and leaves the
  /// earlier writes in place.
  pub fn set_many<I>(&self, pairs: I, options: &StoreOptions) -> Result<()>
  where
    I: IntoIterator<Item = Pair>,
  {
    let resolved = self.resolver.resolve(options);
    for pair in pairs {
      self.write(&pair.key, pair.value.as_ref(), &resolved)?;
    }
    Ok(())
  }

  fn write(&self, key: &str, value: Option<&Value>, resolved: &ResolvedOptions) -> Result<()> {
    if key.is_empty() {
      tracing::warn!("Ignoring set: {}", StashError::InvalidArgument("key must not be empty".into()));
      return Ok(());
    }

    let slot = namespaced_key(key, resolved);
    let backend = self.backends.select(resolved.backend);

    let Some(value) = value else {
      backend.remove_item(&slot);
      return Ok(());
    };

    let encoded = if resolved.strict {
      encode_strict(value, resolved.expire_at)?
    } else {
      if resolved.expire_at.is_some() {
        tracing::warn!("Loose entry '{}' is stored without its expiry", slot);
      }
      encode_loose(value)?
    };

    backend
      .set_item(&slot, &encoded)
      .map_err(|source| StashError::BackendWrite {
        backend: resolved.backend,
        key: slot.clone(),
        source,
      })?;

    bump(&self.counters.writes);
    tracing::trace!("Stored '{}' in {} backend ({} bytes)", slot, resolved.backend, encoded.len());
    Ok(())
  }

  /// Delete a key. Missing keys are ignored.
  pub fn remove(&self, key: &str, options: &StoreOptions) {
    let resolved = self.resolver.resolve(options);
    self.delete(key, &resolved);
  }

  pub fn remove_many<I, K>(&self, keys: I, options: &StoreOptions)
  where
    I: IntoIterator<Item = K>,
    K: AsRef<str>,
  {
    let resolved = self.resolver.resolve(options);
    for key in keys {
      self.delete(key.as_ref(), &resolved);
    }
  }

  fn delete(&self, key: &str, resolved: &ResolvedOptions) {
    if key.is_empty() {
      tracing::warn!("Ignoring remove: {}", StashError::InvalidArgument("key must not be empty".into()));
      return;
    }
    let slot = namespaced_key(key, resolved);
    self.backends.select(resolved.backend).remove_item(&slot);
  }

  /// Delete every key in the namespace from both backends.
  ///
  /// The backend option is ignored; an empty namespace wipes both backends.
  pub fn clear(&self, options: &StoreOptions) {
    let resolved = self.resolver.resolve(options);

    if resolved.namespace.is_empty() {
      for (_, backend) in self.backends.all() {
        backend.clear();
      }
      tracing::info!("Cleared all backends");
      return;
    }

    for (kind, backend) in self.backends.all() {
      let removed = clear_prefix(backend.as_ref(), &resolved.namespace);
      tracing::debug!(
        "Cleared {} keys with prefix '{}' from {} backend",
        removed,
        resolved.namespace,
        kind
      );
    }
  }

  /// Logical keys stored in the namespace of the selected backend.
  ///
  /// Entries are not decoded, so expired ones are listed until read.
  pub fn keys(&self, options: &StoreOptions) -> Vec<String> {
    let resolved = self.resolver.resolve(options);
    self
      .backends
      .select(resolved.backend)
      .keys()
      .iter()
      .filter_map(|k| strip_namespace(k, &resolved.namespace))
      .map(str::to_string)
      .collect()
  }

  pub fn stats(&self) -> StoreStats {
    let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
    StoreStats {
      hits: load(&self.counters.hits),
      misses: load(&self.counters.misses),
      expired: load(&self.counters.expired),
      corrupt: load(&self.counters.corrupt),
      consumed: load(&self.counters.consumed),
      writes: load(&self.counters.writes),
    }
  }
}

fn clear_prefix(backend: &dyn StorageBackend, namespace: &str) -> usize {
  let doomed: Vec<String> = backend
    .keys()
    .into_iter()
    .filter(|k| in_namespace(k, namespace))
    .collect();
  for key in &doomed {
    backend.remove_item(key);
  }
  doomed.len()
}

impl std::fmt::Debug for EntryStore {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("EntryStore")
      .field("backends", &self.backends)
      .field("resolver", &self.resolver)
      .field("stats", &self.stats())
      .finish()
  }
}
