//! Remote Data Service Client
//!
//! Issue parameterized commands to a remote data service and receive typed
//! tabular results back, over a compact short key wire format.
//!
//! # Examples
//!
//! Execute a batch:
//!
//! ```no_run
//! use tabwire::{Client, ClientConfig, Command, ParamBinding, ServiceRequest, ValueKind};
//! # use tabwire::crypto::{Cipher, CryptoError};
//! # struct Aes;
//! # impl Cipher for Aes {
//! #     fn encrypt(&self, p: &str, _: &str, _: &str) -> Result<String, CryptoError> { Ok(p.into()) }
//! #     fn decrypt(&self, c: &str, _: &str, _: &str) -> Result<String, CryptoError> { Ok(c.into()) }
//! # }
//!
//! # async fn app() -> tabwire::Result<()> {
//! let client = Client::new(Aes, ClientConfig::from_env());
//!
//! let insert = Command::procedure("main", "usp_insert_user")
//!     .param("name", ParamBinding::new(ValueKind::String).size(50))
//!     .values([("name", "foo")])
//!     .values([("name", "bar")]);
//!
//! let request = ServiceRequest::new("UserService")
//!     .token("user-token")
//!     .command("insert", insert);
//!
//! let data = client.execute(&request).await?;
//! # Ok(())
//! # }
//! ```
//!
//! Typed row access:
//!
//! ```no_run
//! # #[cfg(feature = "macros")]
//! # fn app(table: tabwire::DataTable) -> tabwire::Result<()> {
//! #[derive(tabwire::FromRow)]
//! struct User {
//!     id: i32,
//!     name: Option<String>,
//! }
//!
//! let users = table.decode_rows::<User>()?;
//! # Ok(())
//! # }
//! ```

mod common;

// Model
pub mod value;
pub mod types;
pub mod row;
pub mod table;
pub mod command;
pub mod envelope;

// Encoding
pub mod codec;

// Dispatch
pub mod crypto;
pub mod transport;
pub mod pool;
pub mod client;

mod error;


pub use value::{TypedValue, ValueKind};
pub use row::{DataRow, FromRow, FromValue, DecodeError};
pub use table::{DataColumn, DataTable, DataSet};
pub use command::{Command, CommandKind, ParamBinding};
pub use envelope::{ServiceRequest, ServiceResponse, Status, UserInfo};
pub use codec::{Codec, Compact, DecodePolicy};

pub use pool::{Pool, PoolConfig, ExhaustedPolicy};
pub use client::{Client, ClientConfig};
pub use error::{Error, ErrorKind, Result, RetryExhausted};

#[cfg(feature = "macros")]
pub use tabwire_macros::FromRow;
