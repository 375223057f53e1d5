use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    DecodeError, TypedValue,
    row::FromValue,
    value::{Typed, ValueKind},
};

/// Carry any [`serde`] type as an opaque json value.
///
/// # Panics
///
/// Note that when converting into [`TypedValue`], if [`Serialize`]
/// implementation decide to fail, it will panics.
#[derive(Debug)]
pub struct Json<T>(pub T);

impl<T> Typed for Json<T> {
    const KIND: ValueKind = ValueKind::Json;
}

impl<T> FromValue for Json<T>
where
    T: DeserializeOwned,
{
    fn from_value(value: TypedValue) -> Result<Self, DecodeError> {
        match value {
            TypedValue::Json(text) => serde_json::from_str(&text).map(Json).map_err(Into::into),
            TypedValue::None => Err(DecodeError::Null),
            other => Err(DecodeError::KindMissmatch { expected: Self::KIND, found: other.kind() }),
        }
    }
}

impl<T: Serialize> From<Json<T>> for TypedValue {
    fn from(value: Json<T>) -> Self {
        TypedValue::Json(serde_json::to_string(&value.0).expect("json serialization failed"))
    }
}

impl<T: Serialize> Serialize for Json<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Json<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(Self(T::deserialize(deserializer)?))
    }
}
