//! Error types

use thiserror::Error;

use crate::backend::BackendKind;

/// Errors reported by a storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
  /// The write would push the backend past its byte quota
  #[error("quota exceeded: {needed} bytes needed, {used} of {quota} bytes used")]
  QuotaExceeded {
    needed: usize,
    used: usize,
    quota: usize,
  },
  /// The backend refused the operation (disabled storage, I/O failure, ...)
  #[error("storage unavailable: {0}")]
  Unavailable(String),
}

/// Errors surfaced by the store facade.
///
/// Recoverable conditions (missing keys, corrupt entries, empty keys) are
/// logged and never reach the caller; only failures that would lose caller
/// data, or that come from constructing the collaborators, end up here.
#[derive(Debug, Error)]
pub enum StashError {
  #[error("invalid argument: {0}")]
  InvalidArgument(String),

  #[error("corrupt entry at '{key}': {reason}")]
  CorruptEntry { key: String, reason: String },

  #[error("write to {backend} backend failed for '{key}': {source}")]
  BackendWrite {
    backend: BackendKind,
    key: String,
    #[source]
    source: BackendError,
  },

  #[error("stored value does not match the requested type: {0}")]
  Deserialize(#[source] serde_json::Error),

  #[error("configuration error: {0}")]
  Config(String),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StashError>;

impl StashError {
  /// True when the error came from a backend refusing a write
  pub fn is_write_failure(&self) -> bool {
    matches!(self, StashError::BackendWrite { .. })
  }
}
