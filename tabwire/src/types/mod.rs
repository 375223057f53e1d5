//! Value payload types and their text formats.
//!
//! Types here own the textual representation used when a payload cannot be
//! carried natively by the wire format:
//!
//! - [`Decimal`], canonical decimal text
//! - date, time and time span text, see [`datetime`]
//! - [`Json`], any [`serde`] type as opaque json text, requires `json` feature
//!
//! [`serde`]: https://docs.rs/serde

mod decimal;
pub mod datetime;

pub use decimal::{Decimal, ParseDecimalError};

#[cfg(feature = "json")]
mod json;
#[cfg(feature = "json")]
pub use json::Json;
