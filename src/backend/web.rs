//! Browser `Storage` backends

use gloo_storage::{LocalStorage, SessionStorage, Storage};
use wasm_bindgen::JsValue;

use super::StorageBackend;
use crate::error::BackendError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Area {
  Local,
  Session,
}

/// `window.localStorage` or `window.sessionStorage`.
///
/// The handle is looked up on every call rather than stored, since
/// `web_sys::Storage` cannot cross threads.
#[derive(Debug, Clone, Copy)]
pub struct WebStorage {
  area: Area,
}

fn js_message(value: &JsValue) -> String {
  value
    .as_string()
    .unwrap_or_else(|| format!("{:?}", value))
}

impl WebStorage {
  pub fn local() -> Self {
    Self { area: Area::Local }
  }

  pub fn session() -> Self {
    Self {
      area: Area::Session,
    }
  }

  fn raw(&self) -> web_sys::Storage {
    match self.area {
      Area::Local => LocalStorage::raw(),
      Area::Session => SessionStorage::raw(),
    }
  }
}

impl StorageBackend for WebStorage {
  fn name(&self) -> &str {
    match self.area {
      Area::Local => "localStorage",
      Area::Session => "sessionStorage",
    }
  }

  fn get_item(&self, key: &str) -> Option<String> {
    match self.raw().get_item(key) {
      Ok(value) => value,
      Err(e) => {
        tracing::warn!("{}.getItem('{}') failed: {}", self.name(), key, js_message(&e));
        None
      }
    }
  }

  fn set_item(&self, key: &str, value: &str) -> Result<(), BackendError> {
    // QuotaExceededError arrives here too; the browser does not expose the quota
    self
      .raw()
      .set_item(key, value)
      .map_err(|e| BackendError::Unavailable(js_message(&e)))
  }

  fn remove_item(&self, key: &str) {
    if let Err(e) = self.raw().remove_item(key) {
      tracing::warn!("{}.removeItem('{}') failed: {}", self.name(), key, js_message(&e));
    }
  }

  fn clear(&self) {
    if let Err(e) = self.raw().clear() {
      tracing::warn!("{}.clear() failed: {}", self.name(), js_message(&e));
    }
  }

  fn keys(&self) -> Vec<String> {
    let storage = self.raw();
    let length = storage.length().unwrap_or(0);
    (0..length)
      .filter_map(|index| storage.key(index).ok().flatten())
      .collect()
  }

  fn len(&self) -> usize {
    self.raw().length().unwrap_or(0) as usize
  }
}
