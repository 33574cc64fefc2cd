use std::fmt;

/// Module tags for log filtering. Each maps to a `--debug-<tag>` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTag {
    Session,
    Filters,
    Query,
    Cache,
    Export,
    Api,
    Storage,
    Config,
    Cli,
}

impl LogTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogTag::Session => "SESSION",
            LogTag::Filters => "FILTERS",
            LogTag::Query => "QUERY",
            LogTag::Cache => "CACHE",
            LogTag::Export => "EXPORT",
            LogTag::Api => "API",
            LogTag::Storage => "STORAGE",
            LogTag::Config => "CONFIG",
            LogTag::Cli => "CLI",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "session" => Some(LogTag::Session),
            "filters" => Some(LogTag::Filters),
            "query" => Some(LogTag::Query),
            "cache" => Some(LogTag::Cache),
            "export" => Some(LogTag::Export),
            "api" => Some(LogTag::Api),
            "storage" => Some(LogTag::Storage),
            "config" => Some(LogTag::Config),
            "cli" => Some(LogTag::Cli),
            _ => None,
        }
    }
}

impl fmt::Display for LogTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
