//! Structured logging for firmscope
//!
//! Tag + level console logging:
//! - Standard log levels (Error/Warning/Info/Debug/Verbose)
//! - Per-module debug control via tags
//! - Colored console output with timestamps
//!
//! ## Usage
//!
//! ```rust
//! use firmscope::logger::{self, LogTag};
//!
//! logger::error(LogTag::Api, "request failed");
//! logger::info(LogTag::Query, "first page loaded");
//! logger::debug(LogTag::Cache, "entry expired"); // only with debug enabled for Cache
//! ```
//!
//! Call `logger::init(LogLevel::Info)` once at startup. The logger config is
//! the one process-wide global in the crate; everything else is injected.

mod format;
mod levels;
mod tags;

use std::collections::HashSet;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

pub use levels::LogLevel;
pub use tags::LogTag;

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub min_level: LogLevel,
    /// Tags with Debug/Verbose output enabled. Empty set means none.
    pub debug_tags: HashSet<LogTag>,
    pub debug_all: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            debug_tags: HashSet::new(),
            debug_all: false,
        }
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> =
    Lazy::new(|| RwLock::new(LoggerConfig::default()));

/// Initialize the logger with a minimum level. Call once at startup.
pub fn init(min_level: LogLevel) {
    let mut config = LOGGER_CONFIG.write();
    config.min_level = min_level;
}

/// Enable Debug-level output for one tag (`--debug-query` style flags).
pub fn enable_debug_tag(tag: LogTag) {
    let mut config = LOGGER_CONFIG.write();
    config.debug_tags.insert(tag);
}

/// Enable Debug-level output for every tag.
pub fn enable_debug_all() {
    let mut config = LOGGER_CONFIG.write();
    config.debug_all = true;
}

pub fn get_config() -> LoggerConfig {
    LOGGER_CONFIG.read().clone()
}

/// Log at ERROR level (always shown, critical issues)
pub fn error(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level (important issues)
pub fn warning(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level (standard operations)
pub fn info(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level (detailed diagnostics, gated per tag)
pub fn debug(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Debug, message);
}

/// Log at VERBOSE level (very detailed tracing)
pub fn verbose(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Verbose, message);
}

fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    let config = LOGGER_CONFIG.read();

    let allowed = match level {
        LogLevel::Debug | LogLevel::Verbose => {
            config.debug_all
                || config.debug_tags.contains(&tag)
                || level.rank() <= config.min_level.rank()
        }
        _ => level.rank() <= config.min_level.rank(),
    };
    if !allowed {
        return;
    }

    eprintln!("{}", format::format_line(tag, level, message));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_gates_debug() {
        let config = LoggerConfig::default();
        assert!(config.debug_tags.is_empty());
        assert_eq!(config.min_level, LogLevel::Info);
        assert!(!config.debug_all);
    }

    #[test]
    fn level_ranks_are_ordered() {
        assert!(LogLevel::Error.rank() < LogLevel::Warning.rank());
        assert!(LogLevel::Warning.rank() < LogLevel::Info.rank());
        assert!(LogLevel::Info.rank() < LogLevel::Debug.rank());
        assert!(LogLevel::Debug.rank() < LogLevel::Verbose.rank());
    }
}
