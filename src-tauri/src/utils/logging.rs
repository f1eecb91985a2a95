//! Tagged logging macros that can be switched off per module.
//!
//! A module opts in by defining two constants before using the macros:
//! ```rust
//! const ENABLE_LOGS: bool = true;
//! const LOG_TAG: &str = "scheduler";
//!
//! use crate::{log_info, log_warn};
//!
//! log_info!("installed reminder for {} days", 5);
//! // => "[scheduler] installed reminder for 5 days"
//! ```

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!("[{}] {}", LOG_TAG, format_args!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!("[{}] {}", LOG_TAG, format_args!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!("[{}] {}", LOG_TAG, format_args!($($arg)*));
        }
    };
}

/// Errors are always emitted; `ENABLE_LOGS` only silences the chattier levels.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        log::error!("[{}] {}", LOG_TAG, format_args!($($arg)*));
    };
}
