//! `tabwire` error types.
use std::{backtrace::Backtrace, fmt, io};

use crate::{
    client::AuthError,
    codec::ProtocolError,
    command::ConfigError,
    crypto::CryptoError,
    envelope::ServiceError,
    row::DecodeError,
    table::TableError,
};

/// A specialized [`Result`] type for `tabwire` operation.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// All possible error from `tabwire` library.
pub struct Error {
    context: String,
    backtrace: Backtrace,
    kind: ErrorKind,
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn into_kind(self) -> ErrorKind {
        self.kind
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Attach context message, shown before the error kind.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Returns `true` if the failure is transient and the call may be attempted again.
    ///
    /// Only transport failures are retryable, everything else is surfaced
    /// to the caller immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::Transport(_))
    }
}

/// All possible error kind from `tabwire` library.
pub enum ErrorKind {
    /// Invalid request or client configuration, detected before sending.
    Config(ConfigError),
    /// Wire data is malformed or unrecognized.
    Protocol(ProtocolError),
    /// Connection failed, timed out, or server answered with unexpected http status.
    Transport(io::Error),
    /// Credential rejected.
    Auth(AuthError),
    /// Remote executor reported an error status.
    Service(ServiceError),
    Crypto(CryptoError),
    Decode(DecodeError),
    /// Retry bound reached.
    Exhausted(RetryExhausted),
}

/// Every attempt of a call failed with a retryable error.
pub struct RetryExhausted {
    attempts: u32,
    last: Box<Error>,
}

impl RetryExhausted {
    pub(crate) fn new(attempts: u32, last: Error) -> Self {
        Self { attempts, last: Box::new(last) }
    }

    /// Returns how many attempts were made.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Returns the error of the final attempt.
    pub fn last_error(&self) -> &Error {
        &self.last
    }
}

macro_rules! from {
    (<$ty:ty>$pat:pat => $body:expr) => {
        impl From<$ty> for Error {
            fn from($pat: $ty) -> Self {
                let backtrace = std::backtrace::Backtrace::capture();
                Self { context: String::new(), backtrace, kind: $body }
            }
        }
    };
}

from!(<ErrorKind>e => e);
from!(<ConfigError>e => ErrorKind::Config(e));
from!(<ProtocolError>e => ErrorKind::Protocol(e));
from!(<std::io::Error>e => ErrorKind::Transport(e));
from!(<AuthError>e => ErrorKind::Auth(e));
from!(<ServiceError>e => ErrorKind::Service(e));
from!(<CryptoError>e => ErrorKind::Crypto(e));
from!(<DecodeError>e => ErrorKind::Decode(e));
from!(<RetryExhausted>e => ErrorKind::Exhausted(e));

from!(<TableError>e => ErrorKind::Config(ConfigError::new(e.reason)));

impl std::error::Error for Error { }

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.context.is_empty() {
            write!(f, "{}: ", self.context)?;
        }

        fmt::Display::fmt(&self.kind, f)?;

        if let std::backtrace::BacktraceStatus::Captured = self.backtrace.status() {
            let mut backtrace = self.backtrace.to_string();
            write!(f, "\n\n")?;
            writeln!(f, "Stack backtrace:")?;
            backtrace.truncate(backtrace.trim_end().len());
            write!(f, "{}", backtrace)?;
        }

        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

impl std::error::Error for ErrorKind { }

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => e.fmt(f),
            Self::Protocol(e) => e.fmt(f),
            Self::Transport(e) => write!(f, "transport error: {e}"),
            Self::Auth(e) => e.fmt(f),
            Self::Service(e) => e.fmt(f),
            Self::Crypto(e) => e.fmt(f),
            Self::Decode(e) => e.fmt(f),
            Self::Exhausted(e) => e.fmt(f),
        }
    }
}

impl fmt::Debug for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

impl std::error::Error for RetryExhausted { }

impl fmt::Display for RetryExhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gave up after {} attempts, last error: {:#}", self.attempts, self.last.kind)
    }
}

impl fmt::Debug for RetryExhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn only_transport_is_retryable() {
        let timeout = Error::from(io::Error::from(io::ErrorKind::TimedOut));
        assert!(timeout.is_retryable());

        assert!(!Error::from(ProtocolError::new("bad")).is_retryable());
        assert!(!Error::from(ConfigError::new("bad")).is_retryable());
        assert!(!Error::from(AuthError::new("rejected")).is_retryable());

        let exhausted = Error::from(RetryExhausted::new(4, timeout));
        assert!(!exhausted.is_retryable());
        let ErrorKind::Exhausted(e) = exhausted.kind() else { panic!() };
        assert_eq!(e.attempts(), 4);
        assert!(e.last_error().is_retryable());
    }

    #[test]
    fn context_is_prefixed() {
        let err = Error::from(ConfigError::new("missing base url")).context("client");
        assert!(err.to_string().starts_with("client: configuration error: missing base url"));
    }
}
