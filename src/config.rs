//! Application configuration.
//!
//! JSON file with defaults written on first run. Values here feed every
//! injected service: timeouts and page size for the API client, TTLs for the
//! cache layers, debounce delays for the query binder, and storage paths.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub cache: CacheSettings,
    pub debounce: DebounceSettings,
    pub storage: StorageSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub graphql_path: String,
    pub refresh_path: String,
    /// Edges requested per page.
    pub page_size: usize,
    /// Page and detail fetches.
    pub request_timeout_secs: u64,
    /// Exports cover the full result set and can run long.
    pub export_timeout_secs: u64,
    pub rate_limit_per_minute: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    pub list_ttl_secs: u64,
    pub stats_ttl_secs: u64,
    pub detail_ttl_secs: u64,
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebounceSettings {
    /// Search-as-you-type.
    pub search_ms: u64,
    /// Whole-filter changes.
    pub filters_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    pub state_path: String,
    pub download_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
}

fn default_state_path() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("firmscope")
        .join("state.json")
        .to_string_lossy()
        .into_owned()
}

fn default_download_dir() -> String {
    dirs::download_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .to_string_lossy()
        .into_owned()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "https://api.firmscope.example".to_string(),
                graphql_path: "/graphql".to_string(),
                refresh_path: "/auth/refresh".to_string(),
                page_size: 20,
                request_timeout_secs: 10,
                export_timeout_secs: 300, // 5 minutes
                rate_limit_per_minute: 120,
            },
            cache: CacheSettings {
                list_ttl_secs: 300,   // 5 minutes
                stats_ttl_secs: 900,  // 15 minutes
                detail_ttl_secs: 3600, // 1 hour
                capacity: 2000,
            },
            debounce: DebounceSettings {
                search_ms: 300,
                filters_ms: 500,
            },
            storage: StorageSettings {
                state_path: default_state_path(),
                download_dir: default_download_dir(),
            },
            logging: LoggingSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            let default_config = Self::default();
            default_config.save(path)?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config dir: {}", parent.display()))?;
        }

        let content =
            serde_json::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.api.base_url.is_empty() {
            anyhow::bail!("api.base_url is required in config");
        }
        if self.api.page_size == 0 {
            anyhow::bail!("api.page_size must be greater than zero");
        }
        if self.api.request_timeout_secs == 0 || self.api.export_timeout_secs == 0 {
            anyhow::bail!("timeouts must be greater than zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_creates_default_file_when_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");

        let config = AppConfig::load(&path).expect("load default");
        assert!(path.exists());
        assert_eq!(config.api.page_size, 20);
        assert_eq!(config.cache.list_ttl_secs, 300);
        assert_eq!(config.debounce.search_ms, 300);
    }

    #[test]
    fn round_trip_preserves_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");

        let mut config = AppConfig::default();
        config.api.page_size = 50;
        config.save(&path).expect("save");

        let loaded = AppConfig::load(&path).expect("load");
        assert_eq!(loaded.api.page_size, 50);
    }

    #[test]
    fn invalid_page_size_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        let mut config = AppConfig::default();
        config.api.page_size = 0;
        config.save(&path).expect("save");

        assert!(AppConfig::load(&path).is_err());
    }
}
