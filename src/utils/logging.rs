//! Logging macros gated on a module-level `ENABLE_LOGS` flag.
//!
//! The analysis loop runs at display rate, so noisy modules switch their
//! output off locally instead of fighting `RUST_LOG` filters:
//! ```rust,ignore
//! const ENABLE_LOGS: bool = false;
//!
//! use crate::{log_debug, log_warn};
//!
//! log_warn!("detector call failed: {err}");
//! ```
//! Every module that uses these macros must define `ENABLE_LOGS`.

/// `log::debug!` when the calling module has `ENABLE_LOGS` set.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

/// `log::info!` when the calling module has `ENABLE_LOGS` set.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// `log::warn!` when the calling module has `ENABLE_LOGS` set.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// `log::error!` when the calling module has `ENABLE_LOGS` set.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
