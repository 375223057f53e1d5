use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::{Map, Number, Value};
use uuid::Uuid;

use super::{Compact, DecodePolicy, Object, ProtocolError, as_str, keys, mismatch};
use crate::{
    DataTable, TypedValue,
    types::{Decimal, datetime},
    value::ValueKind,
};

const NAN: &str = "NaN";
const INFINITY: &str = "Infinity";
const NEG_INFINITY: &str = "-Infinity";

impl Compact for TypedValue {
    fn to_compact(&self) -> Value {
        let kind = self.kind();
        let mut map = Map::with_capacity(2);
        map.insert(keys::KIND.into(), Value::from(kind.code()));

        let payload = match self {
            TypedValue::None => return Value::Object(map),
            TypedValue::Char(c) => Value::String(c.to_string()),
            TypedValue::Chars(cs) => Value::String(cs.iter().collect()),
            TypedValue::Byte(b) => Value::from(*b),
            TypedValue::Bytes(b) => Value::String(STANDARD.encode(b)),
            TypedValue::Boolean(b) => Value::Bool(*b),
            TypedValue::Int16(i) => Value::from(*i),
            TypedValue::Int32(i) => Value::from(*i),
            TypedValue::Int64(i) => Value::String(itoa::Buffer::new().format(*i).into()),
            TypedValue::UInt16(u) => Value::from(*u),
            TypedValue::UInt32(u) => Value::from(*u),
            TypedValue::UInt64(u) => Value::String(itoa::Buffer::new().format(*u).into()),
            TypedValue::Single(f) => float_to_compact(f64::from(*f)),
            TypedValue::Double(f) => float_to_compact(*f),
            TypedValue::Decimal(d) => Value::String(d.to_string()),
            TypedValue::String(s) => Value::String(s.clone()),
            TypedValue::DateTime(dt) => Value::String(datetime::format_date_time(dt)),
            TypedValue::DateTimeOffset(dt) => Value::String(datetime::format_date_time_offset(dt)),
            TypedValue::TimeSpan(ts) => Value::String(datetime::format_time_span(ts)),
            TypedValue::Guid(g) => Value::String(g.hyphenated().to_string()),
            TypedValue::Json(j) => Value::String(j.clone()),
            TypedValue::Vector(v) => Value::Array(v.iter().map(|f| float_to_compact(f64::from(*f))).collect()),
            TypedValue::Table(t) => t.to_compact(),
        };

        if let Some(key) = keys::payload(kind) {
            map.insert(key.into(), payload);
        }

        Value::Object(map)
    }

    fn from_compact(value: &Value, policy: DecodePolicy) -> Result<Self, ProtocolError> {
        let obj = Object::new(value, "value")?;

        let code = obj.u64(keys::KIND)?;
        let kind = ValueKind::from_code(code)
            .ok_or_else(|| ProtocolError::new(format!("unknown value kind {code}")))?;
        let own = keys::payload(kind);

        for key in obj.map.keys() {
            if key == keys::KIND || own == Some(key.as_str()) {
                continue;
            }
            if let Some(other) = keys::kind_of_payload(key) {
                return Err(ProtocolError::new(format!(
                    "value kind {kind} carries {other} payload {key:?}"
                )));
            }
            policy.unknown_key(key, obj.name)?;
        }

        let Some(key) = own else {
            return Ok(TypedValue::None);
        };

        let payload = obj.map.get(key).ok_or_else(|| {
            ProtocolError::new(format!("value kind {kind} is missing its payload {key:?}"))
        })?;

        decode_payload(kind, key, payload, policy)
    }
}

fn decode_payload(
    kind: ValueKind,
    key: &str,
    payload: &Value,
    policy: DecodePolicy,
) -> Result<TypedValue, ProtocolError> {
    let text = || as_str(payload, key);
    let invalid = |e: &dyn std::fmt::Display| ProtocolError::new(format!("invalid {kind} payload: {e}"));

    let value = match kind {
        ValueKind::None => TypedValue::None,
        ValueKind::Char => {
            let mut chars = text()?.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => TypedValue::Char(c),
                _ => return Err(invalid(&"expected exactly one character")),
            }
        }
        ValueKind::Chars => TypedValue::Chars(text()?.chars().collect()),
        ValueKind::Byte => TypedValue::Byte(unsigned(payload, key)?),
        ValueKind::Bytes => TypedValue::Bytes(STANDARD.decode(text()?).map_err(|e| invalid(&e))?.into()),
        ValueKind::Boolean => TypedValue::Boolean(
            payload.as_bool().ok_or_else(|| mismatch(key, "boolean", payload))?,
        ),
        ValueKind::Int16 => TypedValue::Int16(signed(payload, key)?),
        ValueKind::Int32 => TypedValue::Int32(signed(payload, key)?),
        ValueKind::Int64 => TypedValue::Int64(integer_text(text()?).map_err(|e| invalid(&e))?),
        ValueKind::UInt16 => TypedValue::UInt16(unsigned(payload, key)?),
        ValueKind::UInt32 => TypedValue::UInt32(unsigned(payload, key)?),
        ValueKind::UInt64 => TypedValue::UInt64(integer_text(text()?).map_err(|e| invalid(&e))?),
        ValueKind::Single => TypedValue::Single(float_from_compact(payload, key)? as f32),
        ValueKind::Double => TypedValue::Double(float_from_compact(payload, key)?),
        ValueKind::Decimal => TypedValue::Decimal(text()?.parse::<Decimal>().map_err(|e| invalid(&e))?),
        ValueKind::String => TypedValue::String(text()?.to_owned()),
        ValueKind::DateTime => {
            TypedValue::DateTime(datetime::parse_date_time(text()?).map_err(|e| invalid(&e))?)
        }
        ValueKind::DateTimeOffset => TypedValue::DateTimeOffset(
            datetime::parse_date_time_offset(text()?).map_err(|e| invalid(&e))?,
        ),
        ValueKind::TimeSpan => {
            TypedValue::TimeSpan(datetime::parse_time_span(text()?).map_err(|e| invalid(&e))?)
        }
        ValueKind::Guid => TypedValue::Guid(Uuid::try_parse(text()?).map_err(|e| invalid(&e))?),
        ValueKind::Json => TypedValue::Json(text()?.to_owned()),
        ValueKind::Vector => match payload {
            Value::Array(items) => TypedValue::Vector(
                items
                    .iter()
                    .map(|f| float_from_compact(f, key).map(|f| f as f32))
                    .collect::<Result<_, _>>()?,
            ),
            other => return Err(mismatch(key, "array", other)),
        },
        ValueKind::Table => TypedValue::Table(Box::new(DataTable::from_compact(payload, policy)?)),
    };

    Ok(value)
}

fn signed<T: TryFrom<i64>>(value: &Value, key: &str) -> Result<T, ProtocolError> {
    value
        .as_i64()
        .and_then(|i| T::try_from(i).ok())
        .ok_or_else(|| mismatch(key, "integer in range", value))
}

fn unsigned<T: TryFrom<u64>>(value: &Value, key: &str) -> Result<T, ProtocolError> {
    value
        .as_u64()
        .and_then(|u| T::try_from(u).ok())
        .ok_or_else(|| mismatch(key, "unsigned integer in range", value))
}

/// Parse integer text, a leading `+` is not canonical and rejected.
fn integer_text<T: std::str::FromStr>(text: &str) -> Result<T, String> {
    if text.starts_with('+') {
        return Err(format!("non canonical integer {text:?}"));
    }
    text.parse().map_err(|_| format!("invalid integer {text:?}"))
}

fn float_to_compact(f: f64) -> Value {
    match Number::from_f64(f) {
        Some(n) => Value::Number(n),
        None if f.is_nan() => Value::String(NAN.into()),
        None if f.is_sign_positive() => Value::String(INFINITY.into()),
        None => Value::String(NEG_INFINITY.into()),
    }
}

fn float_from_compact(value: &Value, key: &str) -> Result<f64, ProtocolError> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| mismatch(key, "float", value)),
        Value::String(s) => match s.as_str() {
            NAN => Ok(f64::NAN),
            INFINITY => Ok(f64::INFINITY),
            NEG_INFINITY => Ok(f64::NEG_INFINITY),
            _ => Err(mismatch(key, "float", value)),
        },
        other => Err(mismatch(key, "float", other)),
    }
}
