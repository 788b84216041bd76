//! In-process backend

use parking_lot::RwLock;
use std::collections::BTreeMap;

use super::StorageBackend;
use crate::error::BackendError;

struct Slots {
  data: BTreeMap<String, String>,
  /// Bytes held by keys plus values
  used: usize,
}

/// Map-backed storage with an optional byte quota.
///
/// Plays the part of `sessionStorage` outside the browser: the contents live
/// exactly as long as the value does.
pub struct MemoryBackend {
  name: String,
  slots: RwLock<Slots>,
  quota: Option<usize>,
}

fn slot_size(key: &str, value: &str) -> usize {
  key.len() + value.len()
}

impl MemoryBackend {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      slots: RwLock::new(Slots {
        data: BTreeMap::new(),
        used: 0,
      }),
      quota: None,
    }
  }

  /// Reject writes that would push the total size past `quota` bytes
  pub fn with_quota(mut self, quota: usize) -> Self {
    self.quota = Some(quota);
    self
  }

  /// Bytes currently held
  pub fn used_bytes(&self) -> usize {
    self.slots.read().used
  }
}

impl StorageBackend for MemoryBackend {
  fn name(&self) -> &str {
    &self.name
  }

  fn get_item(&self, key: &str) -> Option<String> {
    self.slots.read().data.get(key).cloned()
  }

  fn set_item(&self, key: &str, value: &str) -> Result<(), BackendError> {
    let mut slots = self.slots.write();
    let replaced = slots
      .data
      .get(key)
      .map(|old| slot_size(key, old))
      .unwrap_or(0);
    let needed = slot_size(key, value);

    if let Some(quota) = self.quota {
      let after = slots.used - replaced + needed;
      if after > quota {
        return Err(BackendError::QuotaExceeded {
          needed,
          used: slots.used,
          quota,
        });
      }
    }

    slots.used = slots.used - replaced + needed;
    slots.data.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove_item(&self, key: &str) {
    let mut slots = self.slots.write();
    if let Some(old) = slots.data.remove(key) {
      slots.used -= slot_size(key, &old);
    }
  }

  fn clear(&self) {
    let mut slots = self.slots.write();
    slots.data.clear();
    slots.used = 0;
  }

  fn keys(&self) -> Vec<String> {
    self.slots.read().data.keys().cloned().collect()
  }

  fn len(&self) -> usize {
    self.slots.read().data.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_set_get_remove() {
    let backend = MemoryBackend::new("session");
    assert!(backend.get_item("a").is_none());

    backend.set_item("a", "1").unwrap();
    assert_eq!(backend.get_item("a").as_deref(), Some("1"));
    assert_eq!(backend.len(), 1);

    backend.remove_item("a");
    backend.remove_item("a");
    assert!(backend.is_empty());
    assert_eq!(backend.used_bytes(), 0);
  }

  #[test]
  fn test_quota_rejects_oversized_write() {
    let backend = MemoryBackend::new("session").with_quota(10);
    backend.set_item("ab", "cdef").unwrap(); // 6 bytes

    let err = backend.set_item("gh", "ijklmn").unwrap_err(); // +8 bytes
    assert_eq!(
      err,
      BackendError::QuotaExceeded {
        needed: 8,
        used: 6,
        quota: 10
      }
    );
    assert!(backend.get_item("gh").is_none());
  }

  #[test]
  fn test_quota_accounts_for_overwrite() {
    let backend = MemoryBackend::new("session").with_quota(10);
    backend.set_item("k", "123456789").unwrap(); // exactly 10
    backend.set_item("k", "12345").unwrap();
    assert_eq!(backend.used_bytes(), 6);
  }

  #[test]
  fn test_keys_sorted() {
    let backend = MemoryBackend::new("local");
    backend.set_item("b", "2").unwrap();
    backend.set_item("a", "1").unwrap();
    assert_eq!(backend.keys(), vec!["a".to_string(), "b".to_string()]);

    backend.clear();
    assert!(backend.keys().is_empty());
  }
}
