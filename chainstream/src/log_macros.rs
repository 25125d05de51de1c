//! Logging shims.
//!
//! Forward to the `log` facade when the `log` feature is enabled. Without it
//! the arguments are still type-checked but nothing is emitted, so call sites
//! never need their own `cfg` attributes.
//!
//! The warning shim is named `log_warn!`; a macro named `warn` is ambiguous
//! with the built-in `#[warn]` attribute.

#![allow(unused_macros)]

macro_rules! trace {
    ($($arg:tt)+) => {
        #[cfg(feature = "log")]
        {
            log::trace!($($arg)+);
        }
        #[cfg(not(feature = "log"))]
        {
            let _ = format_args!($($arg)+);
        }
    };
}

macro_rules! debug {
    ($($arg:tt)+) => {
        #[cfg(feature = "log")]
        {
            log::debug!($($arg)+);
        }
        #[cfg(not(feature = "log"))]
        {
            let _ = format_args!($($arg)+);
        }
    };
}

macro_rules! log_warn {
    ($($arg:tt)+) => {
        #[cfg(feature = "log")]
        {
            log::warn!($($arg)+);
        }
        #[cfg(not(feature = "log"))]
        {
            let _ = format_args!($($arg)+);
        }
    };
}

pub(crate) use {debug, log_warn, trace};
