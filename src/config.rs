//! Configuration module for conductor-inventory
//!
//! Handles loading and merging configuration from multiple sources:
//! - Default values
//! - System configuration (/etc/conductor/conductor.toml)
//! - User configuration (~/.conductor.toml, <config dir>/conductor/conductor.toml)
//! - Project configuration (./conductor.toml)
//! - The file named by `CONDUCTOR_CONFIG`
//! - Environment variables
//!
//! The loader itself only needs the validated [`BackendSettings`]; use
//! [`BackendSettings::from_config`] to check a configuration before any
//! network or file access happens.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Error;
use crate::inventory::MalformedEntryPolicy;

/// Default cache time-to-live
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum age of the cache file before a remote refresh is attempted
    #[serde(with = "humantime_serde")]
    pub cache_ttl: Duration,

    /// Directory holding the cache files (`~` is expanded)
    pub cache_dir: PathBuf,

    /// Inventory service settings
    pub backend: BackendConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_dir: default_cache_dir(),
            backend: BackendConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|d| d.join("conductor"))
        .unwrap_or_else(|| PathBuf::from(".conductor/cache"))
}

/// Inventory service settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the inventory service
    pub url: Option<String>,

    /// Comma separated work group (project) names
    pub work_groups: Option<String>,

    /// Handling of document entries that do not match the schema
    pub malformed_entries: MalformedEntryPolicy,
}

/// Logging settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level when neither `RUST_LOG` nor `-v` is given
    pub level: Option<String>,
}

impl Config {
    /// Load configuration from all sources
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Config::default();

        for path in Self::get_config_paths(config_path) {
            if path.exists() {
                config = config.merge_from_file(&path)?;
            }
        }

        config.apply_env_overrides()?;

        Ok(config)
    }

    /// Get the list of configuration file paths to check, lowest precedence first
    fn get_config_paths(explicit_path: Option<&PathBuf>) -> Vec<PathBuf> {
        // Explicit path replaces every other location
        if let Some(path) = explicit_path {
            return vec![path.clone()];
        }

        let mut paths = vec![PathBuf::from("/etc/conductor/conductor.toml")];

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".conductor.toml"));
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("conductor/conductor.toml"));
        }

        paths.push(PathBuf::from("conductor.toml"));

        if let Ok(env_config) = std::env::var("CONDUCTOR_CONFIG") {
            paths.push(PathBuf::from(env_config));
        }

        paths
    }

    /// Merge configuration from a file
    fn merge_from_file(&self, path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let file_config: Config = match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            _ => toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
        };

        Ok(self.merge(file_config))
    }

    /// Merge another config into this one; values the other config leaves at
    /// their defaults do not override ours
    ///
    /// A value equal to its default is indistinguishable from an absent one,
    /// so a later file cannot set `cache_ttl = "1h"`, `cache_dir` or
    /// `malformed_entries = "skip"` back to the default over an earlier
    /// file. Use the matching `CONDUCTOR_*` variable for that.
    fn merge(&self, other: Config) -> Config {
        Config {
            cache_ttl: if other.cache_ttl != DEFAULT_CACHE_TTL {
                other.cache_ttl
            } else {
                self.cache_ttl
            },
            cache_dir: if other.cache_dir != default_cache_dir() {
                other.cache_dir
            } else {
                self.cache_dir.clone()
            },
            backend: BackendConfig {
                url: other.backend.url.or_else(|| self.backend.url.clone()),
                work_groups: other
                    .backend
                    .work_groups
                    .or_else(|| self.backend.work_groups.clone()),
                malformed_entries: if other.backend.malformed_entries
                    != MalformedEntryPolicy::default()
                {
                    other.backend.malformed_entries
                } else {
                    self.backend.malformed_entries
                },
            },
            logging: LoggingConfig {
                level: other.logging.level.or_else(|| self.logging.level.clone()),
            },
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        // CONDUCTOR_URL
        if let Ok(url) = std::env::var("CONDUCTOR_URL") {
            self.backend.url = Some(url);
        }

        // CONDUCTOR_WORK_GROUPS
        if let Ok(work_groups) = std::env::var("CONDUCTOR_WORK_GROUPS") {
            self.backend.work_groups = Some(work_groups);
        }

        // CONDUCTOR_CACHE_DIR
        if let Ok(dir) = std::env::var("CONDUCTOR_CACHE_DIR") {
            self.cache_dir = PathBuf::from(dir);
        }

        // CONDUCTOR_CACHE_TTL
        if let Ok(ttl) = std::env::var("CONDUCTOR_CACHE_TTL") {
            self.cache_ttl = humantime_serde::re::humantime::parse_duration(&ttl)
                .with_context(|| format!("Invalid CONDUCTOR_CACHE_TTL value: {}", ttl))?;
        }

        // CONDUCTOR_MALFORMED_ENTRIES
        if let Ok(policy) = std::env::var("CONDUCTOR_MALFORMED_ENTRIES") {
            self.backend.malformed_entries = match policy.to_ascii_lowercase().as_str() {
                "skip" => MalformedEntryPolicy::Skip,
                "reject" => MalformedEntryPolicy::Reject,
                other => anyhow::bail!("Invalid CONDUCTOR_MALFORMED_ENTRIES value: {}", other),
            };
        }

        // CONDUCTOR_LOG_LEVEL
        if let Ok(level) = std::env::var("CONDUCTOR_LOG_LEVEL") {
            self.logging.level = Some(level);
        }

        Ok(())
    }

    /// Load from a specific file only, ignoring the standard locations
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path_buf = path.as_ref().to_path_buf();
        Config::default().merge_from_file(&path_buf)
    }
}

/// Validated settings the loader is built from
#[derive(Debug, Clone, PartialEq)]
pub struct BackendSettings {
    /// Base URL of the inventory service
    pub url: String,
    /// Requested work group names, in configured order
    pub work_groups: Vec<String>,
    /// Cache time-to-live
    pub cache_ttl: Duration,
    /// Cache directory with `~` expanded
    pub cache_dir: PathBuf,
    /// Parser policy for malformed entries
    pub malformed_entries: MalformedEntryPolicy,
}

impl BackendSettings {
    /// Validate a configuration without touching the network or the disk
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let work_groups = config
            .backend
            .work_groups
            .as_deref()
            .map(split_work_groups)
            .unwrap_or_default();
        if work_groups.is_empty() {
            return Err(Error::config("backend work groups are not configured"));
        }

        let url = config
            .backend
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::config("backend API URL is not configured"))?;
        validate_url(url)?;

        let cache_dir = PathBuf::from(
            shellexpand::tilde(&config.cache_dir.to_string_lossy()).into_owned(),
        );

        Ok(Self {
            url: url.to_string(),
            work_groups,
            cache_ttl: config.cache_ttl,
            cache_dir,
            malformed_entries: config.backend.malformed_entries,
        })
    }
}

/// Split a comma separated list, tolerating whitespace around the commas
pub fn split_work_groups(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

fn validate_url(url: &str) -> crate::Result<()> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(Error::config(format!(
            "backend API URL must start with http:// or https://: {}",
            url
        )));
    }

    url::Url::parse(url)
        .map_err(|e| Error::config(format!("invalid backend API URL '{}': {}", url, e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(url: Option<&str>, work_groups: Option<&str>) -> Config {
        Config {
            backend: BackendConfig {
                url: url.map(String::from),
                work_groups: work_groups.map(String::from),
                ..BackendConfig::default()
            },
            ..Config::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.cache_ttl, Duration::from_secs(3600));
        assert!(config.backend.url.is_none());
        assert_eq!(config.backend.malformed_entries, MalformedEntryPolicy::Skip);
    }

    #[test]
    fn test_split_work_groups() {
        assert_eq!(split_work_groups("infra , web,db"), vec!["infra", "web", "db"]);
        assert_eq!(split_work_groups("  infra  "), vec!["infra"]);
        assert!(split_work_groups(" , ,").is_empty());
    }

    #[test]
    fn test_settings_require_url() {
        let err = BackendSettings::from_config(&backend(None, Some("infra"))).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("URL")));

        let err = BackendSettings::from_config(&backend(Some("  "), Some("infra"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_settings_require_work_groups() {
        let err =
            BackendSettings::from_config(&backend(Some("http://c.example.net"), None)).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("work groups")));

        let err = BackendSettings::from_config(&backend(Some("http://c.example.net"), Some(" , ")))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_settings_reject_bad_url() {
        let err = BackendSettings::from_config(&backend(Some("conductor.example.net"), Some("a")))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = BackendSettings::from_config(&backend(Some("http://"), Some("a"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_settings_from_valid_config() {
        let mut config = backend(Some("https://c.example.net/"), Some("web, infra"));
        config.cache_dir = PathBuf::from("/tmp/conductor");
        let settings = BackendSettings::from_config(&config).unwrap();

        assert_eq!(settings.url, "https://c.example.net/");
        assert_eq!(settings.work_groups, vec!["web", "infra"]);
        assert_eq!(settings.cache_dir, PathBuf::from("/tmp/conductor"));
    }

    #[test]
    fn test_config_merge() {
        let base = backend(Some("http://a.example.net"), Some("infra"));
        let other = Config {
            cache_ttl: Duration::from_secs(300),
            ..backend(Some("http://b.example.net"), None)
        };

        let merged = base.merge(other);
        assert_eq!(merged.cache_ttl, Duration::from_secs(300));
        assert_eq!(merged.backend.url.as_deref(), Some("http://b.example.net"));
        assert_eq!(merged.backend.work_groups.as_deref(), Some("infra"));
    }

    #[test]
    fn test_merge_cannot_restore_defaults() {
        let base = Config {
            cache_ttl: Duration::from_secs(300),
            backend: BackendConfig {
                malformed_entries: MalformedEntryPolicy::Reject,
                ..BackendConfig::default()
            },
            ..Config::default()
        };
        let other: Config = toml::from_str(
            "cache_ttl = \"1h\"\n[backend]\nmalformed_entries = \"skip\"",
        )
        .unwrap();

        let merged = base.merge(other);
        assert_eq!(merged.cache_ttl, Duration::from_secs(300));
        assert_eq!(merged.backend.malformed_entries, MalformedEntryPolicy::Reject);
    }

    #[test]
    #[serial_test::serial]
    fn test_conductor_config_env_is_layered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layered.toml");
        std::env::set_var("CONDUCTOR_CONFIG", &path);
        let paths = Config::get_config_paths(None);
        std::env::remove_var("CONDUCTOR_CONFIG");

        assert_eq!(paths.last(), Some(&path));
        assert!(paths.contains(&PathBuf::from("/etc/conductor/conductor.toml")));
        assert!(paths.len() > 1);
    }

    #[test]
    fn test_parse_toml() {
        let config: Config = toml::from_str(
            r#"
cache_ttl = "30m"
cache_dir = "/var/cache/conductor"

[backend]
url = "https://c.example.net"
work_groups = "infra, web"
malformed_entries = "reject"

[logging]
level = "debug"
"#,
        )
        .unwrap();

        assert_eq!(config.cache_ttl, Duration::from_secs(1800));
        assert_eq!(config.cache_dir, PathBuf::from("/var/cache/conductor"));
        assert_eq!(config.backend.malformed_entries, MalformedEntryPolicy::Reject);
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
    }
}
