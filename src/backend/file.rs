//! JSON-file backend
//!
//! Keeps every slot in memory and rewrites the whole file after each
//! mutation (temp file + rename), which is the native stand-in for
//! `localStorage`.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::StorageBackend;
use crate::error::{BackendError, Result};

pub struct FileBackend {
  path: PathBuf,
  data: Mutex<BTreeMap<String, String>>,
  quota: Option<usize>,
}

impl FileBackend {
  /// Open (or lazily create) the data file at `path`.
  ///
  /// A missing file is an empty backend; the file is only created on the
  /// first write.
  pub fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_path_buf();
    let data = if path.exists() {
      let content = fs::read_to_string(&path)?;
      if content.trim().is_empty() {
        BTreeMap::new()
      } else {
        serde_json::from_str(&content)?
      }
    } else {
      BTreeMap::new()
    };

    tracing::debug!("Opened data file {} ({} keys)", path.display(), data.len());

    Ok(Self {
      path,
      data: Mutex::new(data),
      quota: None,
    })
  }

  pub fn with_quota(mut self, quota: usize) -> Self {
    self.quota = Some(quota);
    self
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn flush(&self, data: &BTreeMap<String, String>) -> std::io::Result<()> {
    if let Some(parent) = self.path.parent() {
      if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)?;
      }
    }

    let json = serde_json::to_vec_pretty(data)?;
    let temp_path = self.path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path)?;
    file.write_all(&json)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&temp_path, &self.path)
  }
}

fn used_bytes(data: &BTreeMap<String, String>) -> usize {
  data.iter().map(|(k, v)| k.len() + v.len()).sum()
}

impl StorageBackend for FileBackend {
  fn name(&self) -> &str {
    "file"
  }

  fn get_item(&self, key: &str) -> Option<String> {
    self.data.lock().get(key).cloned()
  }

  fn set_item(&self, key: &str, value: &str) -> std::result::Result<(), BackendError> {
    let mut data = self.data.lock();

    if let Some(quota) = self.quota {
      let used = used_bytes(&data);
      let replaced = data.get(key).map(|old| key.len() + old.len()).unwrap_or(0);
      let needed = key.len() + value.len();
      if used - replaced + needed > quota {
        return Err(BackendError::QuotaExceeded {
          needed,
          used,
          quota,
        });
      }
    }

    let previous = data.insert(key.to_string(), value.to_string());
    if let Err(e) = self.flush(&data) {
      // Keep memory and disk in agreement
      match previous {
        Some(old) => data.insert(key.to_string(), old),
        None => data.remove(key),
      };
      return Err(BackendError::Unavailable(format!(
        "failed to write {}: {}",
        self.path.display(),
        e
      )));
    }
    Ok(())
  }

  fn remove_item(&self, key: &str) {
    let mut data = self.data.lock();
    if data.remove(key).is_some() {
      if let Err(e) = self.flush(&data) {
        tracing::warn!("Failed to persist removal of '{}': {}", key, e);
      }
    }
  }

  fn clear(&self) {
    let mut data = self.data.lock();
    if data.is_empty() {
      return;
    }
    data.clear();
    if let Err(e) = self.flush(&data) {
      tracing::warn!("Failed to persist clear of {}: {}", self.path.display(), e);
    }
  }

  fn keys(&self) -> Vec<String> {
    self.data.lock().keys().cloned().collect()
  }

  fn len(&self) -> usize {
    self.data.lock().len()
  }
}
