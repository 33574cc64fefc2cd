use chrono::Utc;
use colored::{ColoredString, Colorize};

use super::levels::LogLevel;
use super::tags::LogTag;

fn colored_level(level: LogLevel) -> ColoredString {
    match level {
        LogLevel::Error => level.as_str().red().bold(),
        LogLevel::Warning => level.as_str().yellow(),
        LogLevel::Info => level.as_str().green(),
        LogLevel::Debug => level.as_str().cyan(),
        LogLevel::Verbose => level.as_str().dimmed(),
    }
}

/// One log line: `2026-08-07 10:21:03 INFO  [QUERY] first page loaded`
pub fn format_line(tag: LogTag, level: LogLevel, message: &str) -> String {
    let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S");
    format!(
        "{} {:<5} [{}] {}",
        timestamp.to_string().dimmed(),
        colored_level(level),
        tag.as_str().blue(),
        message
    )
}
