//! File configuration (`stash.yaml`)

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, StashError};
use crate::options::Defaults;

const CONFIG_FILES: [&str; 2] = ["stash.yaml", "stash.yml"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StashConfig {
  #[serde(default)]
  pub defaults: Defaults,
  #[serde(default)]
  pub storage: StorageSection,
  #[serde(default)]
  pub logging: LoggingSection,
}

/// Where the native backends keep their data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSection {
  /// Data file of the persistent backend
  #[serde(default = "default_path")]
  pub path: String,
  /// Byte quota of the persistent backend ("5mb", "512kb", ...); empty = unlimited
  #[serde(default = "default_quota")]
  pub quota: String,
  /// Byte quota of the session backend
  #[serde(default = "default_quota")]
  pub session_quota: String,
}

fn default_path() -> String {
  "./data/stash.json".into()
}

// Browsers allot roughly 5MB per origin and storage area
fn default_quota() -> String {
  "5mb".into()
}

impl Default for StorageSection {
  fn default() -> Self {
    Self {
      path: default_path(),
      quota: default_quota(),
      session_quota: default_quota(),
    }
  }
}

impl StorageSection {
  pub fn quota_bytes(&self) -> Option<usize> {
    parse_size(&self.quota)
  }

  pub fn session_quota_bytes(&self) -> Option<usize> {
    parse_size(&self.session_quota)
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
  #[serde(default = "default_level")]
  pub level: String,
}

fn default_level() -> String {
  "info".into()
}

impl Default for LoggingSection {
  fn default() -> Self {
    Self {
      level: default_level(),
    }
  }
}

impl StashConfig {
  pub fn from_yaml(content: &str) -> Result<Self> {
    let expanded = expand_env_vars(content);
    serde_yaml::from_str(&expanded).map_err(|e| StashError::Config(e.to_string()))
  }

  pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
      .map_err(|e| StashError::Config(format!("cannot read {}: {}", path.display(), e)))?;
    Self::from_yaml(&content)
  }

  /// Load the first `stash.yaml`/`stash.yml` found in the working directory
  pub fn find_and_load() -> Result<Option<Self>> {
    for p in CONFIG_FILES {
      if Path::new(p).exists() {
        tracing::info!("Loading config from {}", p);
        return Self::from_file(p).map(Some);
      }
    }
    Ok(None)
  }
}

/// Replace `${NAME}` and `$NAME` with environment values (unset = empty)
pub fn expand_env_vars(input: &str) -> String {
  let mut out = String::with_capacity(input.len());
  let mut chars = input.chars().peekable();

  while let Some(c) = chars.next() {
    if c != '$' {
      out.push(c);
      continue;
    }

    let mut name = String::new();
    if chars.peek() == Some(&'{') {
      chars.next();
      let mut closed = false;
      for n in chars.by_ref() {
        if n == '}' {
          closed = true;
          break;
        }
        name.push(n);
      }
      if !closed {
        out.push_str("${");
        out.push_str(&name);
        continue;
      }
    } else {
      while let Some(&n) = chars.peek() {
        if n.is_ascii_alphanumeric() || n == '_' {
          name.push(n);
          chars.next();
        } else {
          break;
        }
      }
      if name.is_empty() {
        out.push('$');
        continue;
      }
    }

    out.push_str(&std::env::var(&name).unwrap_or_default());
  }

  out
}

/// Parse a size such as `5mb`, `512 KB` or `1024` into bytes.
///
/// An empty string or `0` means no limit and yields `None`, as does garbage.
pub fn parse_size(s: &str) -> Option<usize> {
  let s = s.trim().to_lowercase();
  let (digits, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
    Some(idx) => s.split_at(idx),
    None => (s.as_str(), ""),
  };

  let multiplier = match unit.trim() {
    "" | "b" => 1,
    "kb" | "k" => 1024,
    "mb" | "m" => 1024 * 1024,
    "gb" | "g" => 1024 * 1024 * 1024,
    _ => return None,
  };

  digits
    .parse::<usize>()
    .ok()
    .filter(|n| *n > 0)
    .and_then(|n| n.checked_mul(multiplier))
}

/// Format bytes for display
pub fn format_size(bytes: usize) -> String {
  const KB: usize = 1024;
  const MB: usize = 1024 * KB;

  if bytes >= MB {
    format!("{:.1}MB", bytes as f64 / MB as f64)
  } else if bytes >= KB {
    format!("{:.1}KB", bytes as f64 / KB as f64)
  } else {
    format!("{}B", bytes)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_size() {
    assert_eq!(parse_size("5mb"), Some(5 * 1024 * 1024));
    assert_eq!(parse_size("512 KB"), Some(512 * 1024));
    assert_eq!(parse_size("1g"), Some(1024 * 1024 * 1024));
    assert_eq!(parse_size("1024"), Some(1024));
    assert_eq!(parse_size("10b"), Some(10));
    assert_eq!(parse_size(""), None);
    assert_eq!(parse_size("0"), None);
    assert_eq!(parse_size("lots"), None);
    assert_eq!(parse_size("5tb"), None);
  }

  #[test]
  fn test_format_size() {
    assert_eq!(format_size(5 * 1024 * 1024), "5.0MB");
    assert_eq!(format_size(1536), "1.5KB");
    assert_eq!(format_size(12), "12B");
  }

  #[test]
  fn test_expand_leaves_plain_text_alone() {
    assert_eq!(expand_env_vars("cost: 5$"), "cost: 5$");
    assert_eq!(expand_env_vars("open ${brace"), "open ${brace");
    assert_eq!(
      expand_env_vars("${WEBSTASH_SURELY_UNSET_VAR}x"),
      "x"
    );
  }
}
