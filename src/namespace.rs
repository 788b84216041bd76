//! Namespaced backend keys
//!
//! A namespace is a plain prefix: key `k` in namespace `p` lives in the slot
//! named `p` followed by `k`. Nothing is escaped, so `("ab", "c")` and
//! `("a", "bc")` share a slot.

use crate::options::ResolvedOptions;

pub fn namespaced_key(logical: &str, options: &ResolvedOptions) -> String {
  format!("{}{}", options.namespace, logical)
}

/// Whether a backend key falls inside `namespace`. Every key is inside the
/// empty namespace.
pub fn in_namespace(backend_key: &str, namespace: &str) -> bool {
  backend_key.starts_with(namespace)
}

/// Recover the logical key from a backend key
pub fn strip_namespace<'a>(backend_key: &'a str, namespace: &str) -> Option<&'a str> {
  backend_key.strip_prefix(namespace)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backend::BackendKind;

  fn opts(namespace: &str) -> ResolvedOptions {
    ResolvedOptions {
      backend: BackendKind::Persistent,
      namespace: namespace.to_string(),
      expire_at: None,
      read_once: false,
      strict: true,
    }
  }

  #[test]
  fn test_concatenation() {
    assert_eq!(namespaced_key("a", &opts("x:")), "x:a");
    assert_eq!(namespaced_key("a", &opts("")), "a");
  }

  #[test]
  fn test_unescaped_keys_can_alias() {
    assert_eq!(
      namespaced_key("c", &opts("ab")),
      namespaced_key("bc", &opts("a"))
    );
  }

  #[test]
  fn test_prefix_membership() {
    assert!(in_namespace("x:a", "x:"));
    assert!(!in_namespace("y:a", "x:"));
    assert!(in_namespace("anything", ""));
    assert_eq!(strip_namespace("x:a", "x:"), Some("a"));
    assert_eq!(strip_namespace("y:a", "x:"), None);
  }
}
