// src/config.rs
// =============================================================================
// Scan configuration.
//
// Values come from three places, later ones winning:
//   1. built-in defaults (the default_* functions below)
//   2. an optional TOML file passed with --config
//   3. command-line flags / environment variables (applied in main.rs)
//
// Example file:
//
//   data_dir = "/var/lib/sentinel/scans"
//   max_concurrency = 20
//   check_timeout_secs = 30
// =============================================================================

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Everything a scan needs to know besides the base URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Root directory for snapshot files (one subdirectory per site)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Maximum health checks in flight at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Sitemap documents fetched at once while resolving
    #[serde(default = "default_sitemap_concurrency")]
    pub sitemap_concurrency: usize,

    /// Upper bound on sitemap documents fetched per resolution
    #[serde(default = "default_max_sitemaps")]
    pub max_sitemaps: usize,

    #[serde(default = "default_robots_timeout")]
    pub robots_timeout_secs: u64,

    #[serde(default = "default_sitemap_timeout")]
    pub sitemap_timeout_secs: u64,

    #[serde(default = "default_check_timeout")]
    pub check_timeout_secs: u64,

    /// Redirect hops followed before a check gives up
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

pub fn default_data_dir() -> PathBuf {
    PathBuf::from("scans")
}

pub fn default_max_concurrency() -> usize {
    50
}

pub fn default_sitemap_concurrency() -> usize {
    8
}

pub fn default_max_sitemaps() -> usize {
    1000
}

pub fn default_robots_timeout() -> u64 {
    10
}

pub fn default_sitemap_timeout() -> u64 {
    20
}

pub fn default_check_timeout() -> u64 {
    15
}

pub fn default_max_redirects() -> usize {
    10
}

pub fn default_user_agent() -> String {
    format!("sitemap-sentinel/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            max_concurrency: default_max_concurrency(),
            sitemap_concurrency: default_sitemap_concurrency(),
            max_sitemaps: default_max_sitemaps(),
            robots_timeout_secs: default_robots_timeout(),
            sitemap_timeout_secs: default_sitemap_timeout(),
            check_timeout_secs: default_check_timeout(),
            max_redirects: default_max_redirects(),
            user_agent: default_user_agent(),
        }
    }
}

impl ScanConfig {
    /// Loads the config file if one was given, otherwise returns defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                debug!("Loading config from {}", path.display());
                let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml(&content)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::Invalid("max_concurrency must be at least 1".into()));
        }
        if self.sitemap_concurrency == 0 {
            return Err(ConfigError::Invalid("sitemap_concurrency must be at least 1".into()));
        }
        if self.max_sitemaps == 0 {
            return Err(ConfigError::Invalid("max_sitemaps must be at least 1".into()));
        }
        if self.robots_timeout_secs == 0 || self.sitemap_timeout_secs == 0 || self.check_timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeouts must be at least 1 second".into()));
        }
        Ok(())
    }

    pub fn robots_timeout(&self) -> Duration {
        Duration::from_secs(self.robots_timeout_secs)
    }

    pub fn sitemap_timeout(&self) -> Duration {
        Duration::from_secs(self.sitemap_timeout_secs)
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.max_concurrency, 50);
        assert_eq!(config.robots_timeout(), Duration::from_secs(10));
        assert_eq!(config.sitemap_timeout(), Duration::from_secs(20));
        assert_eq!(config.check_timeout(), Duration::from_secs(15));
        assert_eq!(config.data_dir, PathBuf::from("scans"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ScanConfig::from_toml("max_concurrency = 7\ndata_dir = \"/tmp/s\"").unwrap();
        assert_eq!(config.max_concurrency, 7);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/s"));
        assert_eq!(config.check_timeout_secs, 15);
    }

    #[test]
    fn test_zero_concurrency_is_invalid() {
        let config = ScanConfig {
            max_concurrency: 0,
            ..ScanConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = ScanConfig::load(Some(Path::new("/definitely/not/here.toml")));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
