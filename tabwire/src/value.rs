//! The [`TypedValue`] type.
use bytes::Bytes;
use std::fmt;
use time::{Duration, OffsetDateTime, PrimitiveDateTime};
use uuid::Uuid;

use crate::{table::DataTable, types::Decimal};

/// Discriminant of a [`TypedValue`].
///
/// The numeric code is the value carried on the wire under the kind tag key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ValueKind {
    None = 0,
    Char = 1,
    Chars = 2,
    Byte = 3,
    Bytes = 4,
    Boolean = 5,
    Int16 = 6,
    Int32 = 7,
    Int64 = 8,
    UInt16 = 9,
    UInt32 = 10,
    UInt64 = 11,
    Single = 12,
    Double = 13,
    Decimal = 14,
    String = 15,
    DateTime = 16,
    DateTimeOffset = 17,
    TimeSpan = 18,
    Guid = 19,
    Json = 20,
    Vector = 21,
    Table = 22,
}

impl ValueKind {
    /// All kinds, ordered by wire code.
    pub const ALL: [ValueKind; 23] = [
        Self::None, Self::Char, Self::Chars, Self::Byte, Self::Bytes, Self::Boolean,
        Self::Int16, Self::Int32, Self::Int64, Self::UInt16, Self::UInt32, Self::UInt64,
        Self::Single, Self::Double, Self::Decimal, Self::String, Self::DateTime,
        Self::DateTimeOffset, Self::TimeSpan, Self::Guid, Self::Json, Self::Vector, Self::Table,
    ];

    /// Returns the wire code.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Lookup kind by its wire code.
    ///
    /// Unknown codes returns [`None`], there is no fallback kind.
    pub const fn from_code(code: u64) -> Option<ValueKind> {
        if code < Self::ALL.len() as u64 {
            Some(Self::ALL[code as usize])
        } else {
            None
        }
    }

    /// Returns the kind name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Char => "char",
            Self::Chars => "chars",
            Self::Byte => "byte",
            Self::Bytes => "bytes",
            Self::Boolean => "boolean",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Single => "single",
            Self::Double => "double",
            Self::Decimal => "decimal",
            Self::String => "string",
            Self::DateTime => "datetime",
            Self::DateTimeOffset => "datetimeoffset",
            Self::TimeSpan => "timespan",
            Self::Guid => "guid",
            Self::Json => "json",
            Self::Vector => "vector",
            Self::Table => "table",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single column value.
///
/// Null is represented by [`TypedValue::None`] rather than by omission, so a
/// row keeps every declared column.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum TypedValue {
    #[default]
    None,
    Char(char),
    Chars(Vec<char>),
    Byte(u8),
    Bytes(Bytes),
    Boolean(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Single(f32),
    Double(f64),
    Decimal(Decimal),
    String(String),
    DateTime(PrimitiveDateTime),
    DateTimeOffset(OffsetDateTime),
    TimeSpan(Duration),
    Guid(Uuid),
    /// Opaque JSON text, never parsed by the client.
    Json(String),
    Vector(Vec<f32>),
    Table(Box<DataTable>),
}

impl TypedValue {
    /// Returns the value discriminant.
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::None => ValueKind::None,
            Self::Char(_) => ValueKind::Char,
            Self::Chars(_) => ValueKind::Chars,
            Self::Byte(_) => ValueKind::Byte,
            Self::Bytes(_) => ValueKind::Bytes,
            Self::Boolean(_) => ValueKind::Boolean,
            Self::Int16(_) => ValueKind::Int16,
            Self::Int32(_) => ValueKind::Int32,
            Self::Int64(_) => ValueKind::Int64,
            Self::UInt16(_) => ValueKind::UInt16,
            Self::UInt32(_) => ValueKind::UInt32,
            Self::UInt64(_) => ValueKind::UInt64,
            Self::Single(_) => ValueKind::Single,
            Self::Double(_) => ValueKind::Double,
            Self::Decimal(_) => ValueKind::Decimal,
            Self::String(_) => ValueKind::String,
            Self::DateTime(_) => ValueKind::DateTime,
            Self::DateTimeOffset(_) => ValueKind::DateTimeOffset,
            Self::TimeSpan(_) => ValueKind::TimeSpan,
            Self::Guid(_) => ValueKind::Guid,
            Self::Json(_) => ValueKind::Json,
            Self::Vector(_) => ValueKind::Vector,
            Self::Table(_) => ValueKind::Table,
        }
    }

    /// Return `true` if value is null.
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Wrap raw JSON text.
    pub fn json(text: impl Into<String>) -> Self {
        Self::Json(text.into())
    }
}

/// A rust type that have corresponding [`ValueKind`].
pub trait Typed {
    const KIND: ValueKind;
}

macro_rules! typed {
    ($ty:ty => $kind:ident $(, $doc:literal)?) => {
        impl Typed for $ty {
            $(#[doc = $doc])?
            const KIND: ValueKind = ValueKind::$kind;
        }

        impl From<$ty> for TypedValue {
            fn from(value: $ty) -> Self {
                Self::$kind(value.into())
            }
        }
    };
}

typed!(char => Char);
typed!(Vec<char> => Chars, "character sequence");
typed!(u8 => Byte);
typed!(Bytes => Bytes);
typed!(Vec<u8> => Bytes);
typed!(bool => Boolean);
typed!(i16 => Int16);
typed!(i32 => Int32);
typed!(i64 => Int64);
typed!(u16 => UInt16);
typed!(u32 => UInt32);
typed!(u64 => UInt64);
typed!(f32 => Single);
typed!(f64 => Double);
typed!(Decimal => Decimal);
typed!(String => String);
typed!(PrimitiveDateTime => DateTime);
typed!(OffsetDateTime => DateTimeOffset);
typed!(Duration => TimeSpan, "time span");
typed!(Uuid => Guid);
typed!(Vec<f32> => Vector, "numeric vector");
typed!(DataTable => Table, "nested table");

impl Typed for &str {
    const KIND: ValueKind = ValueKind::String;
}

impl From<&str> for TypedValue {
    fn from(value: &str) -> Self {
        Self::String(value.into())
    }
}

impl From<&[u8]> for TypedValue {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(Bytes::copy_from_slice(value))
    }
}

impl<T: Into<TypedValue>> From<Option<T>> for TypedValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => value.into(),
            None => Self::None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn kind_codes_are_dense() {
        for (i, kind) in ValueKind::ALL.iter().enumerate() {
            assert_eq!(kind.code() as usize, i);
            assert_eq!(ValueKind::from_code(i as u64), Some(*kind));
        }
        assert_eq!(ValueKind::from_code(23), None);
        assert_eq!(ValueKind::from_code(u64::MAX), None);
    }

    #[test]
    fn value_agrees_with_kind() {
        assert_eq!(TypedValue::from(42i32).kind(), i32::KIND);
        assert_eq!(TypedValue::from("foo").kind(), ValueKind::String);
        assert_eq!(TypedValue::from(vec![1u8, 2]).kind(), ValueKind::Bytes);
        assert_eq!(TypedValue::from(None::<i64>), TypedValue::None);
        assert!(TypedValue::default().is_none());
    }
}
