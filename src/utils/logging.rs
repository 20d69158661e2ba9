//! Logging setup and per-module switchable logging macros.
//!
//! Each module that uses the macros declares its own flag:
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//! use crate::{log_debug, log_info, log_warn};
//!
//! log_info!("window tracker started");
//! ```
//!
//! Flipping the flag to `false` silences a chatty module without touching
//! the global `RUST_LOG` filter.

use std::sync::Once;

static INIT: Once = Once::new();

/// Install `env_logger` once per process. Reads `RUST_LOG`, defaults to `info`.
///
/// Safe to call from every entry point and from tests; later calls are no-ops.
pub fn init_logging() {
    INIT.call_once(|| {
        let _ = env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .parse_default_env()
            .is_test(cfg!(test))
            .try_init();
    });
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

/// Info logging gated on the calling module's `ENABLE_LOGS`.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Warn logging gated on the calling module's `ENABLE_LOGS`.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Error logging gated on the calling module's `ENABLE_LOGS`.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
