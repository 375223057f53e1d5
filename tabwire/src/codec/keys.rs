//! Short key table, wire format version 1.
//!
//! Keys are only unique within one object type.
use crate::value::ValueKind;

/// Wire format version.
pub const VERSION: u8 = 1;

/// Value kind tag.
pub const KIND: &str = "k";

/// Payload key of every value kind, indexed by kind code.
const PAYLOAD: [Option<&str>; 23] = [
    None,       // none
    Some("c"),  // char
    Some("cs"), // chars
    Some("b"),  // byte
    Some("bs"), // bytes
    Some("bo"), // boolean
    Some("i2"), // int16
    Some("i4"), // int32
    Some("i8"), // int64
    Some("u2"), // uint16
    Some("u4"), // uint32
    Some("u8"), // uint64
    Some("f4"), // single
    Some("f8"), // double
    Some("d"),  // decimal
    Some("s"),  // string
    Some("dt"), // datetime
    Some("do"), // datetimeoffset
    Some("ts"), // timespan
    Some("g"),  // guid
    Some("j"),  // json
    Some("v"),  // vector
    Some("t"),  // table
];

/// Returns payload key of `kind`, [`None`] for [`ValueKind::None`].
pub const fn payload(kind: ValueKind) -> Option<&'static str> {
    PAYLOAD[kind.code() as usize]
}

/// Returns the kind that owns payload `key`.
pub fn kind_of_payload(key: &str) -> Option<ValueKind> {
    ValueKind::ALL.into_iter().find(|kind| payload(*kind) == Some(key))
}

// table
pub const TABLE_NAME: &str = "n";
pub const TABLE_COLUMNS: &str = "c";
pub const TABLE_ROWS: &str = "r";

// column
pub const COLUMN_FIELD: &str = "f";
pub const COLUMN_CAPTION: &str = "c";
pub const COLUMN_TYPE: &str = "t";

// dataset
pub const DATASET_NAME: &str = "n";
pub const DATASET_TABLES: &str = "t";

// parameter binding, declared kind reuse `KIND`
pub const BINDING_SIZE: &str = "sz";
pub const BINDING_TARGET_COMMAND: &str = "tc";
pub const BINDING_TARGET_PARAM: &str = "tp";

// command
pub const COMMAND_CONNECTION: &str = "cn";
pub const COMMAND_TEXT: &str = "ct";
pub const COMMAND_KIND: &str = "ck";
pub const COMMAND_PARAMS: &str = "pm";
pub const COMMAND_VALUE_SETS: &str = "vs";

// request
pub const REQUEST_SERVICE: &str = "sn";
pub const REQUEST_TRANSACTION: &str = "tx";
pub const REQUEST_TOKEN: &str = "tk";
pub const REQUEST_COMMANDS: &str = "cm";

// response and login response
pub const RESPONSE_STATUS: &str = "st";
pub const RESPONSE_MESSAGE: &str = "ms";
pub const RESPONSE_DATA: &str = "ds";
pub const RESPONSE_TOKEN: &str = "tk";

// login request
pub const LOGIN_EMAIL: &str = "e";
pub const LOGIN_PASSWORD: &str = "p";
