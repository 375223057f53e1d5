//! Compact wire codec.
//!
//! One canonical in-memory model, mapped to and from a compact json tree with
//! short field keys. The key table lives in [`keys`].
//!
//! Payloads that json cannot carry exactly are sent as text:
//!
//! - 64 bit integers, decimal text
//! - byte sequence, standard base64 with padding
//! - decimal, see [`Decimal`][crate::types::Decimal]
//! - date, time and time span, see [`datetime`][crate::types::datetime]
//! - non finite floats, `"NaN"`, `"Infinity"` and `"-Infinity"`
//!
//! Decoding an unknown value kind always fails. Unknown keys fail under
//! [`DecodePolicy::Strict`] and are skipped under [`DecodePolicy::Lenient`].
use bytes::Bytes;
use serde_json::{Map, Value};

use crate::common::{reason_error, span, verbose};

pub mod keys;
mod value;
mod table;
mod envelope;

/// Type that have a compact wire representation.
pub trait Compact: Sized {
    /// Map self into compact form.
    fn to_compact(&self) -> Value;

    /// Map compact form back into self.
    fn from_compact(value: &Value, policy: DecodePolicy) -> Result<Self, ProtocolError>;
}

/// How decoder treat keys outside the key table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DecodePolicy {
    /// Unknown key is an error.
    #[default]
    Strict,
    /// Unknown key is ignored.
    Lenient,
}

impl DecodePolicy {
    fn unknown_key(self, key: &str, object: &str) -> Result<(), ProtocolError> {
        match self {
            Self::Strict => Err(ProtocolError::new(format!("unknown key {key:?} in {object}"))),
            Self::Lenient => {
                verbose!("ignored unknown key {key:?} in {object}");
                Ok(())
            }
        }
    }
}

/// Encode and decode compact messages as json bytes.
#[derive(Clone, Copy, Debug, Default)]
pub struct Codec {
    policy: DecodePolicy,
}

impl Codec {
    pub const fn new(policy: DecodePolicy) -> Codec {
        Self { policy }
    }

    pub const fn policy(&self) -> DecodePolicy {
        self.policy
    }

    /// Encode into json bytes.
    pub fn encode<T: Compact>(&self, message: &T) -> Bytes {
        Bytes::from(message.to_compact().to_string())
    }

    /// Decode from json bytes.
    pub fn decode<T: Compact>(&self, body: &[u8]) -> Result<T, ProtocolError> {
        span!("decode", message = std::any::type_name::<T>(), len = body.len());
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| ProtocolError::new(format!("malformed json: {e}")))?;
        T::from_compact(&value, self.policy)
    }
}

reason_error! {
    /// An error when wire data is malformed or unrecognized.
    pub struct ProtocolError("protocol error");
}

// ===== decode helpers =====

/// Object being decoded, remembers its name for error message.
struct Object<'a> {
    name: &'static str,
    map: &'a Map<String, Value>,
}

impl<'a> Object<'a> {
    fn new(value: &'a Value, name: &'static str) -> Result<Self, ProtocolError> {
        match value {
            Value::Object(map) => Ok(Self { name, map }),
            other => Err(ProtocolError::new(format!("expected {name} object, found {}", type_name(other)))),
        }
    }

    /// Check every key is one of `known`.
    fn known_keys(&self, known: &[&str], policy: DecodePolicy) -> Result<(), ProtocolError> {
        for key in self.map.keys() {
            if !known.contains(&key.as_str()) {
                policy.unknown_key(key, self.name)?;
            }
        }
        Ok(())
    }

    /// Returns field, `null` is treated as absent.
    fn opt(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    fn req(&self, key: &str) -> Result<&'a Value, ProtocolError> {
        self.opt(key)
            .ok_or_else(|| ProtocolError::new(format!("missing key {key:?} in {}", self.name)))
    }

    fn str(&self, key: &str) -> Result<&'a str, ProtocolError> {
        as_str(self.req(key)?, key)
    }

    fn opt_str(&self, key: &str) -> Result<Option<&'a str>, ProtocolError> {
        self.opt(key).map(|v| as_str(v, key)).transpose()
    }

    fn u64(&self, key: &str) -> Result<u64, ProtocolError> {
        as_u64(self.req(key)?, key)
    }

    fn opt_u64(&self, key: &str) -> Result<Option<u64>, ProtocolError> {
        self.opt(key).map(|v| as_u64(v, key)).transpose()
    }

    fn array(&self, key: &str) -> Result<&'a Vec<Value>, ProtocolError> {
        match self.req(key)? {
            Value::Array(items) => Ok(items),
            other => Err(mismatch(key, "array", other)),
        }
    }

    fn object(&self, key: &str) -> Result<&'a Map<String, Value>, ProtocolError> {
        match self.req(key)? {
            Value::Object(map) => Ok(map),
            other => Err(mismatch(key, "object", other)),
        }
    }
}

fn as_str<'a>(value: &'a Value, key: &str) -> Result<&'a str, ProtocolError> {
    value.as_str().ok_or_else(|| mismatch(key, "string", value))
}

fn as_u64(value: &Value, key: &str) -> Result<u64, ProtocolError> {
    value.as_u64().ok_or_else(|| mismatch(key, "unsigned integer", value))
}

fn mismatch(key: &str, expected: &str, found: &Value) -> ProtocolError {
    ProtocolError::new(format!("expected {expected} at {key:?}, found {}", type_name(found)))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::TypedValue;

    #[test]
    fn encode_writes_compact_json() {
        let body = Codec::default().encode(&TypedValue::Int32(1));
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, serde_json::json!({"k": 7, "i4": 1}));
        assert!(!body.contains(&b' '));
    }

    #[test]
    fn malformed_json() {
        let err = Codec::default().decode::<TypedValue>(b"{\"k\":").unwrap_err();
        assert!(err.reason().starts_with("malformed json"));
    }

    #[test]
    fn policy_on_unknown_key() {
        let body = br#"{"k":7,"i4":1,"zz":true}"#;
        assert!(Codec::new(DecodePolicy::Strict).decode::<TypedValue>(body).is_err());
        assert_eq!(
            Codec::new(DecodePolicy::Lenient).decode::<TypedValue>(body).unwrap(),
            TypedValue::Int32(1),
        );
    }
}
