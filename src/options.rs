//! Per-call options and their resolution against process-wide defaults

use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;

use crate::backend::BackendKind;
use crate::clock::Clock;

/// Call-site overrides. Every field left unset falls back to [`Defaults`].
///
/// ```rust
/// use webstash::StoreOptions;
///
/// let opts = StoreOptions::new().namespace("app:").expire(60_000).once();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreOptions {
  #[serde(default, alias = "use", skip_serializing_if = "Option::is_none")]
  pub backend: Option<BackendKind>,

  #[serde(default, alias = "pre", skip_serializing_if = "Option::is_none")]
  pub namespace: Option<String>,

  /// Relative expiry in milliseconds. Zero, negative and non-integer values
  /// mean "never expires".
  #[serde(
    default,
    alias = "expireAt",
    deserialize_with = "lenient_millis",
    skip_serializing_if = "Option::is_none"
  )]
  pub expire: Option<i64>,

  #[serde(default, alias = "once", skip_serializing_if = "Option::is_none")]
  pub read_once: Option<bool>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub strict: Option<bool>,
}

fn lenient_millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
  let value = Option::<serde_json::Value>::deserialize(deserializer)?;
  Ok(value.and_then(|v| v.as_i64()))
}

impl StoreOptions {
  pub fn new() -> Self {
    Self::default()
  }

  /// Select a backend by alias (`"local"`, `"session"`, ...)
  pub fn use_backend(self, alias: &str) -> Self {
    self.backend(BackendKind::from_alias(alias))
  }

  pub fn backend(mut self, kind: BackendKind) -> Self {
    self.backend = Some(kind);
    self
  }

  pub fn session(self) -> Self {
    self.backend(BackendKind::Session)
  }

  pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
    self.namespace = Some(namespace.into());
    self
  }

  /// Expire `millis` milliseconds after the options are resolved
  pub fn expire(mut self, millis: i64) -> Self {
    self.expire = Some(millis);
    self
  }

  /// Delete the entry as soon as it has been read
  pub fn once(mut self) -> Self {
    self.read_once = Some(true);
    self
  }

  pub fn strict(mut self, strict: bool) -> Self {
    self.strict = Some(strict);
    self
  }

  /// Shorthand for `strict(false)`
  pub fn loose(self) -> Self {
    self.strict(false)
  }
}

/// Process-wide defaults applied under every call's [`StoreOptions`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
  #[serde(alias = "use")]
  pub backend: BackendKind,
  #[serde(alias = "pre")]
  pub namespace: String,
  /// Relative expiry in milliseconds, re-anchored at every resolution
  #[serde(deserialize_with = "lenient_millis")]
  pub expire: Option<i64>,
  #[serde(alias = "once", alias = "readOnce")]
  pub read_once: bool,
  pub strict: bool,
}

impl Default for Defaults {
  fn default() -> Self {
    Self {
      backend: BackendKind::Persistent,
      namespace: String::new(),
      expire: None,
      read_once: false,
      strict: true,
    }
  }
}

/// Fully merged options for a single operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOptions {
  pub backend: BackendKind,
  pub namespace: String,
  /// Absolute expiry in epoch milliseconds
  pub expire_at: Option<i64>,
  pub read_once: bool,
  pub strict: bool,
}

/// Turn a relative expiry into an absolute timestamp
pub fn absolute_expiry(relative_millis: Option<i64>, now_millis: i64) -> Option<i64> {
  relative_millis
    .filter(|ms| *ms > 0)
    .map(|ms| now_millis.saturating_add(ms))
}

/// Merges [`StoreOptions`] over [`Defaults`]
#[derive(Clone)]
pub struct ConfigResolver {
  defaults: Defaults,
  clock: Arc<dyn Clock>,
}

impl ConfigResolver {
  pub fn new(defaults: Defaults, clock: Arc<dyn Clock>) -> Self {
    Self { defaults, clock }
  }

  pub fn defaults(&self) -> &Defaults {
    &self.defaults
  }

  pub fn now_millis(&self) -> i64 {
    self.clock.now_millis()
  }

  /// Merge field by field; never fails
  pub fn resolve(&self, overrides: &StoreOptions) -> ResolvedOptions {
    let relative = match overrides.expire {
      Some(ms) => Some(ms),
      None => self.defaults.expire,
    };

    ResolvedOptions {
      backend: overrides.backend.unwrap_or(self.defaults.backend),
      namespace: overrides
        .namespace
        .clone()
        .unwrap_or_else(|| self.defaults.namespace.clone()),
      expire_at: absolute_expiry(relative, self.clock.now_millis()),
      read_once: overrides.read_once.unwrap_or(self.defaults.read_once),
      strict: overrides.strict.unwrap_or(self.defaults.strict),
    }
  }
}

impl std::fmt::Debug for ConfigResolver {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ConfigResolver")
      .field("defaults", &self.defaults)
      .finish_non_exhaustive()
  }
}
