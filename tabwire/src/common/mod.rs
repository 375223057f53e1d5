//! Supporting utility macros.

/// Trace when `verbose` feature enabled.
macro_rules! verbose {
    ($($tt:tt)*) => {
        #[cfg(feature = "verbose")]
        tracing::trace!($($tt)*)
    };
}

/// Create and enter `Span` when `verbose` feature enabled.
macro_rules! span {
    ($($tt:tt)*) => {
        #[cfg(feature = "verbose")]
        let s = tracing::trace_span!($($tt)*);
        #[cfg(feature = "verbose")]
        let _s = s.enter();
    };
}

/// Log warning when `log` feature enabled.
macro_rules! log_warn {
    ($($tt:tt)*) => {
        #[cfg(feature = "log")]
        log::warn!($($tt)*)
    };
}

/// Log error when `log` feature enabled.
macro_rules! log_error {
    ($($tt:tt)*) => {
        #[cfg(feature = "log")]
        log::error!($($tt)*)
    };
}

/// Declare an error type that carries a reason string.
macro_rules! reason_error {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident($prefix:literal);
    ) => {
        $(#[$meta])*
        $vis struct $name {
            pub(crate) reason: std::borrow::Cow<'static, str>,
        }

        impl $name {
            pub(crate) fn new(reason: impl Into<std::borrow::Cow<'static, str>>) -> Self {
                Self { reason: reason.into() }
            }

            /// Returns the failure reason.
            pub fn reason(&self) -> &str {
                &self.reason
            }
        }

        impl std::error::Error for $name { }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                if f.alternate() {
                    return f.write_str(&self.reason)
                }
                write!(f, concat!($prefix, ": {}"), self.reason)
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "\"{self}\"")
            }
        }
    };
}

pub(crate) use verbose;
pub(crate) use span;
pub(crate) use log_warn;
pub(crate) use log_error;
pub(crate) use reason_error;
