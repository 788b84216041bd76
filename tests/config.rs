//! Configuration tests - YAML loading, defaults and environment expansion

use std::io::Write;
use tempfile::NamedTempFile;
use webstash::config::{expand_env_vars, StashConfig};
use webstash::{BackendKind, Defaults, StoreOptions};

// =============================================================================
// Default Configuration Tests
// =============================================================================

#[test]
fn test_config_defaults() {
  let config = StashConfig::default();
  assert_eq!(config.defaults, Defaults::default());
  assert_eq!(config.defaults.backend, BackendKind::Persistent);
  assert!(config.defaults.strict);
  assert_eq!(config.storage.path, "./data/stash.json");
  assert_eq!(config.storage.quota_bytes(), Some(5 * 1024 * 1024));
  assert_eq!(config.logging.level, "info");
}

#[test]
fn test_empty_yaml_uses_defaults() {
  let config = StashConfig::from_yaml("{}").unwrap();
  assert_eq!(config.defaults, Defaults::default());
  assert_eq!(config.storage.session_quota, "5mb");
}

// =============================================================================
// YAML Loading Tests
// =============================================================================

#[test]
fn test_defaults_from_yaml_short_names() {
  let yaml = r#"
defaults:
  use: session
  pre: "app:"
  expire: 60000
  once: true
  strict: false
"#;

  let config = StashConfig::from_yaml(yaml).unwrap();
  assert_eq!(config.defaults.backend, BackendKind::Session);
  assert_eq!(config.defaults.namespace, "app:");
  assert_eq!(config.defaults.expire, Some(60000));
  assert!(config.defaults.read_once);
  assert!(!config.defaults.strict);
}

#[test]
fn test_defaults_from_yaml_partial() {
  let yaml = r#"
defaults:
  namespace: "x:"
"#;

  let config = StashConfig::from_yaml(yaml).unwrap();
  assert_eq!(config.defaults.namespace, "x:");
  assert_eq!(config.defaults.backend, BackendKind::Persistent);
  assert!(config.defaults.strict, "strict should default to true");
}

#[test]
fn test_unknown_backend_alias_in_yaml_means_session() {
  let config = StashConfig::from_yaml("defaults:\n  backend: lcoal\n").unwrap();
  assert_eq!(config.defaults.backend, BackendKind::Session);
}

#[test]
fn test_non_string_backend_alias_in_yaml_means_session() {
  let config = StashConfig::from_yaml("defaults:\n  use: [local]\n").unwrap();
  assert_eq!(config.defaults.backend, BackendKind::Session);

  let config = StashConfig::from_yaml("defaults:\n  use: 1\n").unwrap();
  assert_eq!(config.defaults.backend, BackendKind::Session);
}

#[test]
fn test_non_numeric_default_expiry_is_ignored() {
  let config = StashConfig::from_yaml("defaults:\n  expire: tomorrow\n").unwrap();
  assert_eq!(config.defaults.expire, None);
}

#[test]
fn test_storage_section() {
  let yaml = r#"
storage:
  path: /tmp/stash-test.json
  quota: ""
  session_quota: 1kb
"#;

  let config = StashConfig::from_yaml(yaml).unwrap();
  assert_eq!(config.storage.path, "/tmp/stash-test.json");
  assert_eq!(config.storage.quota_bytes(), None);
  assert_eq!(config.storage.session_quota_bytes(), Some(1024));
}

#[test]
fn test_invalid_yaml_is_a_config_error() {
  let err = StashConfig::from_yaml("defaults: [unclosed").unwrap_err();
  assert!(matches!(err, webstash::StashError::Config(_)));
}

#[test]
fn test_from_file() {
  let mut file = NamedTempFile::new().unwrap();
  writeln!(file, "logging:\n  level: debug").unwrap();

  let config = StashConfig::from_file(file.path()).unwrap();
  assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_from_missing_file_is_a_config_error() {
  let err = StashConfig::from_file("/definitely/not/here/stash.yaml").unwrap_err();
  assert!(matches!(err, webstash::StashError::Config(_)));
}

// =============================================================================
// Environment Expansion Tests
// =============================================================================

#[test]
fn test_env_expansion_in_yaml() {
  std::env::set_var("WEBSTASH_TEST_DATA_DIR", "/var/lib/stash");
  let yaml = "storage:\n  path: ${WEBSTASH_TEST_DATA_DIR}/data.json\n";

  let config = StashConfig::from_yaml(yaml).unwrap();
  assert_eq!(config.storage.path, "/var/lib/stash/data.json");
}

#[test]
fn test_env_expansion_forms() {
  std::env::set_var("WEBSTASH_TEST_NS", "tenant");
  assert_eq!(expand_env_vars("$WEBSTASH_TEST_NS:"), "tenant:");
  assert_eq!(expand_env_vars("${WEBSTASH_TEST_NS}-x"), "tenant-x");
  assert_eq!(expand_env_vars("$WEBSTASH_TEST_UNSET_NAME/a"), "/a");
}

// =============================================================================
// Options Serialization Tests
// =============================================================================

#[test]
fn test_store_options_camel_case() {
  let opts: StoreOptions =
    serde_json::from_str(r#"{"backend": "local", "namespace": "n:", "readOnce": true, "strict": false}"#)
      .unwrap();
  assert_eq!(
    opts,
    StoreOptions::new()
      .backend(BackendKind::Persistent)
      .namespace("n:")
      .once()
      .strict(false)
  );
}

#[test]
fn test_store_options_numeric_use_means_session() {
  let opts: StoreOptions = serde_json::from_str(r#"{"use": 1}"#).unwrap();
  assert_eq!(opts, StoreOptions::new().session());
}

#[test]
fn test_store_options_serialize_skips_unset() {
  let json = serde_json::to_string(&StoreOptions::new().namespace("n:")).unwrap();
  assert_eq!(json, r#"{"namespace":"n:"}"#);
}
