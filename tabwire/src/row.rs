//! Row operation.
//!
//! - [`DataRow`]
//! - [`FromRow`]
//! - [`FromValue`]
//!
//! - [`DecodeError`]
use bytes::Bytes;
use std::{borrow::Cow, collections::BTreeMap, fmt};
use time::{Duration, OffsetDateTime, PrimitiveDateTime};
use uuid::Uuid;

use crate::{
    TypedValue,
    table::DataTable,
    types::Decimal,
    value::{Typed, ValueKind},
};

/// A single row, values are looked up by column name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataRow {
    values: BTreeMap<String, TypedValue>,
}

impl DataRow {
    /// Create empty row.
    pub fn new() -> DataRow {
        Self::default()
    }

    /// Set column value, returns the previous value if any.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<TypedValue>) -> Option<TypedValue> {
        self.values.insert(column.into(), value.into())
    }

    /// Builder variant of [`DataRow::insert`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<TypedValue>) -> Self {
        self.insert(column, value);
        self
    }

    /// Returns `true` if row contains no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns the raw value of a column.
    pub fn get(&self, column: &str) -> Option<&TypedValue> {
        self.values.get(column)
    }

    /// Returns `true` if row have a value for the column, including `none`.
    pub fn contains(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    /// Try get and decode column.
    pub fn try_get<R: FromValue>(&self, column: &str) -> Result<R, DecodeError> {
        match self.values.get(column) {
            Some(value) => R::from_value(value.clone()),
            None => Err(DecodeError::ColumnNotFound(String::from(column).into())),
        }
    }

    /// Remove and decode column.
    pub fn take<R: FromValue>(&mut self, column: &str) -> Result<R, DecodeError> {
        match self.values.remove(column) {
            Some(value) => R::from_value(value),
            None => Err(DecodeError::ColumnNotFound(String::from(column).into())),
        }
    }

    /// Iterate column name and value pairs, ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypedValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate column names, ordered by name.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Try decode type using [`FromRow`] implementation.
    pub fn decode<D: FromRow>(self) -> Result<D, DecodeError> {
        D::from_row(self)
    }
}

impl<K: Into<String>, V: Into<TypedValue>> FromIterator<(K, V)> for DataRow {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl IntoIterator for DataRow {
    type Item = (String, TypedValue);

    type IntoIter = std::collections::btree_map::IntoIter<String, TypedValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

// ===== Traits =====

/// Type that can be constructed from a row.
pub trait FromRow: Sized {
    /// Construct self from row.
    fn from_row(row: DataRow) -> Result<Self, DecodeError>;
}

impl FromRow for DataRow {
    fn from_row(row: DataRow) -> Result<Self, DecodeError> {
        Ok(row)
    }
}

impl FromRow for () {
    fn from_row(_: DataRow) -> Result<Self, DecodeError> {
        Ok(())
    }
}

/// A type that can be constructed from [`TypedValue`].
pub trait FromValue: Sized {
    /// Try decode self from value.
    fn from_value(value: TypedValue) -> Result<Self, DecodeError>;
}

impl FromValue for TypedValue {
    fn from_value(value: TypedValue) -> Result<Self, DecodeError> {
        Ok(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: TypedValue) -> Result<Self, DecodeError> {
        match value.is_none() {
            true => Ok(None),
            false => T::from_value(value).map(Some),
        }
    }
}

macro_rules! from_value {
    ($ty:ty => $kind:ident) => {
        from_value!($ty => $kind, std::convert::identity);
    };
    ($ty:ty => $kind:ident, $map:expr) => {
        impl FromValue for $ty {
            fn from_value(value: TypedValue) -> Result<Self, DecodeError> {
                match value {
                    TypedValue::$kind(v) => Ok(($map)(v)),
                    TypedValue::None => Err(DecodeError::Null),
                    other => Err(DecodeError::KindMissmatch {
                        expected: <$ty as Typed>::KIND,
                        found: other.kind(),
                    }),
                }
            }
        }
    };
}

from_value!(char => Char);
from_value!(Vec<char> => Chars);
from_value!(u8 => Byte);
from_value!(Bytes => Bytes);
from_value!(Vec<u8> => Bytes, |b: Bytes| b.to_vec());
from_value!(bool => Boolean);
from_value!(i16 => Int16);
from_value!(i32 => Int32);
from_value!(i64 => Int64);
from_value!(u16 => UInt16);
from_value!(u32 => UInt32);
from_value!(u64 => UInt64);
from_value!(f32 => Single);
from_value!(f64 => Double);
from_value!(Decimal => Decimal);
from_value!(String => String);
from_value!(PrimitiveDateTime => DateTime);
from_value!(OffsetDateTime => DateTimeOffset);
from_value!(Duration => TimeSpan);
from_value!(Uuid => Guid);
from_value!(Vec<f32> => Vector);
from_value!(DataTable => Table, |t: Box<DataTable>| *t);

/// An error when decoding row value.
pub enum DecodeError {
    /// Column requested not found.
    ColumnNotFound(Cow<'static,str>),
    /// Value kind is not the requested kind.
    KindMissmatch {
        expected: ValueKind,
        found: ValueKind,
    },
    /// Value is null.
    Null,
    /// Failed to deserialize using `serde_json`.
    #[cfg(feature = "json")]
    Json(serde_json::error::Error),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("failed to decode value, ")?;
        match self {
            Self::ColumnNotFound(name) => write!(f, "column not found: {name:?}"),
            Self::KindMissmatch { expected, found } => {
                write!(f, "kind missmatch, expected {expected} found {found}")
            }
            Self::Null => write!(f, "unexpected none value"),
            #[cfg(feature = "json")]
            Self::Json(e) => write!(f, "{e}"),
        }
    }
}

#[cfg(feature = "json")]
impl From<serde_json::error::Error> for DecodeError {
    fn from(e: serde_json::error::Error) -> Self {
        Self::Json(e)
    }
}

impl std::error::Error for DecodeError { }

impl fmt::Debug for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn typed_access() {
        let mut row = DataRow::new()
            .with("id", 7i32)
            .with("name", "foo")
            .with("deleted_at", TypedValue::None);

        assert_eq!(row.try_get::<i32>("id").unwrap(), 7);
        assert_eq!(row.try_get::<String>("name").unwrap(), "foo");
        assert_eq!(row.try_get::<Option<i64>>("deleted_at").unwrap(), None);
        assert!(matches!(row.try_get::<i64>("deleted_at"), Err(DecodeError::Null)));
        assert!(matches!(
            row.try_get::<i64>("id"),
            Err(DecodeError::KindMissmatch { expected: ValueKind::Int64, found: ValueKind::Int32 })
        ));
        assert!(matches!(row.try_get::<i32>("nope"), Err(DecodeError::ColumnNotFound(_))));

        assert_eq!(row.take::<i32>("id").unwrap(), 7);
        assert!(!row.contains("id"));
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn collect_row() {
        let row: DataRow = [("a", 1i16), ("b", 2i16)].into_iter().collect();
        assert_eq!(row.columns().collect::<Vec<_>>(), ["a", "b"]);
    }
}
