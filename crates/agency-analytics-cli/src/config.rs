use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use agency_analytics_core::SnapshotOptions;
use anyhow::{Context, Result};
use serde::Deserialize;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MIN_TIMEOUT_SECS: u64 = 1;
const MAX_TIMEOUT_SECS: u64 = 300;

pub const URL_ENV: &str = "AGENCY_ANALYTICS_URL";
pub const API_KEY_ENV: &str = "AGENCY_ANALYTICS_API_KEY";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub snapshot: SnapshotOptions,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl AppConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("agency-analytics").join("config.toml"))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist and parse. The default path is optional:
    /// when it is missing the built-in defaults are used.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Environment variables take priority over the config file.
    pub fn with_env_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = var(URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.store.base_url = Some(url);
        }
        if let Some(key) = var(API_KEY_ENV).filter(|v| !v.trim().is_empty()) {
            self.store.api_key = Some(key);
        }
        self
    }
}

impl StoreConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert!(config.store.base_url.is_none());
        assert_eq!(config.store.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.snapshot, SnapshotOptions::default());
    }

    #[test]
    fn test_partial_config() {
        let config: AppConfig = toml::from_str(
            r#"
            [store]
            base_url = "https://db.example.com"

            [snapshot]
            months = 12
            "#,
        )
        .unwrap();
        assert_eq!(config.store.base_url.as_deref(), Some("https://db.example.com"));
        assert_eq!(config.snapshot.months, 12);
        assert_eq!(config.snapshot.activity_limit, 15);
        assert_eq!(config.snapshot.top_clients, 5);
    }

    #[test]
    fn test_env_overrides_file() {
        let config = AppConfig {
            store: StoreConfig {
                base_url: Some("https://file.example.com".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
        .with_env_overrides(|key| match key {
            URL_ENV => Some("https://env.example.com".to_string()),
            API_KEY_ENV => Some("  ".to_string()),
            _ => None,
        });

        assert_eq!(config.store.base_url.as_deref(), Some("https://env.example.com"));
        assert!(config.store.api_key.is_none());
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[store]\ntimeout_secs = 0").unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.store.request_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::from_file(&dir.path().join("nope.toml")).is_err());
    }
}
