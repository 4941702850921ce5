//! Configuration Management
//!
//! Handles persistent configuration storage for glclusters. Tokens are never
//! stored here.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Instance used when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "https://gitlab.com";

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// GitLab instance URL
    #[serde(default)]
    pub base_url: Option<String>,
    /// Default group (numeric ID or full path)
    #[serde(default)]
    pub group: Option<String>,
    /// Request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("glclusters").join("config.json"))
    }

    /// Log file, next to the config file
    pub fn log_path() -> PathBuf {
        match dirs::config_dir() {
            Some(dir) => dir.join("glclusters").join("glclusters.log"),
            None => PathBuf::from("glclusters.log"),
        }
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load configuration from a specific file, defaulting on any problem
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;

        Ok(())
    }

    /// Get effective base URL (CLI > GITLAB_URL > config > gitlab.com)
    pub fn effective_base_url(&self, cli: Option<&str>) -> String {
        cli.map(str::to_string)
            .or_else(|| env_var("GITLAB_URL"))
            .or_else(|| self.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    /// Get effective group (CLI > GITLAB_GROUP > config)
    pub fn effective_group(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string)
            .or_else(|| env_var("GITLAB_GROUP"))
            .or_else(|| self.group.clone())
    }

    /// Request timeout, falling back to the client default
    pub fn timeout(&self) -> Duration {
        self.timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(crate::gitlab::client::DEFAULT_TIMEOUT)
    }

    /// Set base URL and save
    pub fn set_base_url(&mut self, base_url: &str) -> Result<()> {
        self.base_url = Some(base_url.to_string());
        self.save()
    }

    /// Set default group and save
    pub fn set_group(&mut self, group: &str) -> Result<()> {
        self.group = Some(group.to_string());
        self.save()
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.json"));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            base_url: Some("https://gitlab.example.com".to_string()),
            group: Some("my-org/platform".to_string()),
            timeout_secs: Some(10),
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path), config);
    }

    #[test]
    fn test_malformed_file_gives_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn test_cli_value_wins() {
        let config = Config {
            base_url: Some("https://from-config".to_string()),
            group: Some("config-group".to_string()),
            timeout_secs: None,
        };
        assert_eq!(config.effective_base_url(Some("https://cli")), "https://cli");
        assert_eq!(config.effective_group(Some("42")), Some("42".to_string()));
    }

    #[test]
    fn test_timeout() {
        assert_eq!(Config::default().timeout(), Duration::from_secs(30));
        let config = Config {
            timeout_secs: Some(5),
            ..Config::default()
        };
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }
}
