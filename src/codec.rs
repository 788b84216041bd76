//! Value encoding
//!
//! Strict mode wraps each value in a self-describing envelope:
//!
//! ```json
//! {"data": {"a": 1}, "type": "Object", "expireAt": 1700000000000}
//! ```
//!
//! Loose mode stores strings and numbers as their bare text and everything
//! else as plain JSON, so the slot looks like ordinary `Storage` usage to
//! other code sharing the backend.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The JSON shape of a stored value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
  String,
  Number,
  Boolean,
  Null,
  Object,
  Array,
}

impl TypeTag {
  pub fn of(value: &Value) -> Self {
    match value {
      Value::String(_) => TypeTag::String,
      Value::Number(_) => TypeTag::Number,
      Value::Bool(_) => TypeTag::Boolean,
      Value::Null => TypeTag::Null,
      Value::Object(_) => TypeTag::Object,
      Value::Array(_) => TypeTag::Array,
    }
  }
}

impl std::fmt::Display for TypeTag {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      TypeTag::String => "String",
      TypeTag::Number => "Number",
      TypeTag::Boolean => "Boolean",
      TypeTag::Null => "Null",
      TypeTag::Object => "Object",
      TypeTag::Array => "Array",
    };
    f.write_str(name)
  }
}

/// A decoded strict-mode entry
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope {
  pub data: Value,
  #[serde(rename = "type")]
  pub tag: TypeTag,
  /// Absolute expiry in epoch milliseconds
  #[serde(rename = "expireAt", default)]
  pub expire_at: Option<i64>,
}

impl Envelope {
  /// An entry is expired from its expiry instant onwards
  pub fn is_expired(&self, now_millis: i64) -> bool {
    self.expire_at.map(|exp| now_millis >= exp).unwrap_or(false)
  }
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
  data: &'a Value,
  #[serde(rename = "type")]
  tag: TypeTag,
  #[serde(rename = "expireAt")]
  expire_at: Option<i64>,
}

#[derive(Debug, Error)]
pub enum CodecError {
  #[error("malformed envelope: {0}")]
  Malformed(#[from] serde_json::Error),
  #[error("type tag {tag} does not match stored {found} value")]
  TypeMismatch { tag: TypeTag, found: TypeTag },
}

/// Serialize `value` into a strict-mode envelope
pub fn encode_strict(value: &Value, expire_at: Option<i64>) -> Result<String, serde_json::Error> {
  serde_json::to_string(&EnvelopeRef {
    data: value,
    tag: TypeTag::of(value),
    expire_at,
  })
}

/// Parse a strict-mode envelope, checking the tag against the data
pub fn decode_strict(raw: &str) -> Result<Envelope, CodecError> {
  let envelope: Envelope = serde_json::from_str(raw)?;
  let found = TypeTag::of(&envelope.data);
  if found != envelope.tag {
    return Err(CodecError::TypeMismatch {
      tag: envelope.tag,
      found,
    });
  }
  Ok(envelope)
}

/// Strings and numbers are written bare, everything else as JSON
pub fn encode_loose(value: &Value) -> Result<String, serde_json::Error> {
  match value {
    Value::String(s) => Ok(s.clone()),
    Value::Number(n) => Ok(n.to_string()),
    other => serde_json::to_string(other),
  }
}

/// Best-effort decode: JSON if it parses, the raw text otherwise
pub fn decode_loose(raw: &str) -> Value {
  serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_type_tag_of() {
    assert_eq!(TypeTag::of(&json!("x")), TypeTag::String);
    assert_eq!(TypeTag::of(&json!(1.5)), TypeTag::Number);
    assert_eq!(TypeTag::of(&json!(false)), TypeTag::Boolean);
    assert_eq!(TypeTag::of(&Value::Null), TypeTag::Null);
    assert_eq!(TypeTag::of(&json!({"a": 1})), TypeTag::Object);
    assert_eq!(TypeTag::of(&json!([1])), TypeTag::Array);
  }

  #[test]
  fn test_strict_envelope_layout() {
    let raw = encode_strict(&json!({"a": 1}), Some(42)).unwrap();
    let parsed: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(
      parsed,
      json!({"data": {"a": 1}, "type": "Object", "expireAt": 42})
    );

    let raw = encode_strict(&json!("42"), None).unwrap();
    let parsed: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed, json!({"data": "42", "type": "String", "expireAt": null}));
  }

  #[test]
  fn test_strict_keeps_string_and_number_apart() {
    let as_string = decode_strict(&encode_strict(&json!("42"), None).unwrap()).unwrap();
    let as_number = decode_strict(&encode_strict(&json!(42), None).unwrap()).unwrap();
    assert_eq!(as_string.data, json!("42"));
    assert_eq!(as_string.tag, TypeTag::String);
    assert_eq!(as_number.data, json!(42));
    assert_eq!(as_number.tag, TypeTag::Number);
  }

  #[test]
  fn test_strict_rejects_garbage() {
    assert!(matches!(decode_strict("hello"), Err(CodecError::Malformed(_))));
    assert!(matches!(decode_strict("42"), Err(CodecError::Malformed(_))));
    assert!(matches!(
      decode_strict(r#"{"a": 1}"#),
      Err(CodecError::Malformed(_))
    ));
  }

  #[test]
  fn test_strict_rejects_tag_mismatch() {
    let err = decode_strict(r#"{"data": "42", "type": "Number", "expireAt": null}"#).unwrap_err();
    assert!(matches!(
      err,
      CodecError::TypeMismatch {
        tag: TypeTag::Number,
        found: TypeTag::String
      }
    ));
  }

  #[test]
  fn test_strict_missing_expiry_means_never() {
    let envelope = decode_strict(r#"{"data": true, "type": "Boolean"}"#).unwrap();
    assert_eq!(envelope.expire_at, None);
    assert!(!envelope.is_expired(i64::MAX));
  }

  #[test]
  fn test_expiry_boundary_is_inclusive() {
    let envelope = Envelope {
      data: json!(1),
      tag: TypeTag::Number,
      expire_at: Some(100),
    };
    assert!(!envelope.is_expired(99));
    assert!(envelope.is_expired(100));
  }

  #[test]
  fn test_loose_primitives_are_bare() {
    assert_eq!(encode_loose(&json!("hello")).unwrap(), "hello");
    assert_eq!(encode_loose(&json!(42)).unwrap(), "42");
    assert_eq!(encode_loose(&json!(true)).unwrap(), "true");
    assert_eq!(encode_loose(&json!({"a": [1, 2]})).unwrap(), r#"{"a":[1,2]}"#);
  }

  #[test]
  fn test_loose_decode_falls_back_to_text() {
    assert_eq!(decode_loose("hello world"), json!("hello world"));
    assert_eq!(decode_loose(r#"{"a":1}"#), json!({"a": 1}));
    // Numeric-looking text cannot be told apart from a number
    assert_eq!(decode_loose("42"), json!(42));
  }
}
