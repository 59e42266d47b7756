//! Configuration management for coursevault
//!
//! Handles loading, saving, and validating configuration from TOML files.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Live message source configuration
    #[serde(default)]
    pub live_source: LiveSourceConfig,

    /// Archival engine configuration
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Search engine configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Live message source (HTTP) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveSourceConfig {
    /// Base URL of the live message API
    #[serde(default = "default_live_source_url")]
    pub base_url: String,

    /// Environment variable name holding the API token
    #[serde(default = "default_live_source_token_env")]
    pub api_token_env: String,

    /// Timeout for bulk fetch/delete calls in seconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Timeout for query-time search calls in seconds
    #[serde(default = "default_search_timeout")]
    pub search_timeout_secs: u64,
}

/// Archival engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Messages older than now - cutoff_days are eligible for archival
    #[serde(default = "default_cutoff_days")]
    pub cutoff_days: i64,

    /// Messages per archive batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Minimum eligible messages before a course is archived at all
    #[serde(default = "default_min_messages")]
    pub min_messages: usize,

    /// Write attempts per batch before it counts as failed
    #[serde(default = "default_max_batch_attempts")]
    pub max_batch_attempts: u32,
}

/// Search engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Minimum query length in characters
    #[serde(default = "default_min_query_len")]
    pub min_query_len: usize,

    /// Maximum query length in characters
    #[serde(default = "default_max_query_len")]
    pub max_query_len: usize,

    /// Maximum combined result count
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// TTL for cached query responses in seconds
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for coursevault data
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,

    /// Path to SQLite database
    pub db_file: PathBuf,

    /// Root directory for the filesystem object-storage backend
    pub archive_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            live_source: LiveSourceConfig::default(),
            archive: ArchiveConfig::default(),
            search: SearchConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl Default for LiveSourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_live_source_url(),
            api_token_env: default_live_source_token_env(),
            fetch_timeout_secs: default_fetch_timeout(),
            search_timeout_secs: default_search_timeout(),
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            cutoff_days: default_cutoff_days(),
            batch_size: default_batch_size(),
            min_messages: default_min_messages(),
            max_batch_attempts: default_max_batch_attempts(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_query_len: default_min_query_len(),
            max_query_len: default_max_query_len(),
            max_results: default_max_results(),
            cache_ttl_secs: default_cache_ttl(),
        }
    }
}

impl Config {
    /// Get the default base directory for coursevault (~/.coursevault)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".coursevault")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig {
            config_file: base.join("config.toml"),
            db_file: base.join("metadata.db"),
            archive_dir: base.join("archive"),
            base_dir: base,
        };
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::NotInitialized);
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        // Set up paths based on config file location
        let base = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        config.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
            db_file: base.join("metadata.db"),
            archive_dir: base.join("archive"),
            base_dir: base,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific base directory, falling back
    /// to defaults when no config file exists yet
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);

        if config.paths.config_file.exists() {
            debug!("Loading config from {:?}", config.paths.config_file);
            let content = std::fs::read_to_string(&config.paths.config_file)?;
            let mut loaded: Config = toml::from_str(&content)?;
            loaded.paths = config.paths;
            config = loaded;
        } else {
            debug!("No config file found, using defaults");
        }

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Get the live source API token from environment
    pub fn live_source_token(&self) -> Option<String> {
        std::env::var(&self.live_source.api_token_env).ok()
    }

    /// Check if coursevault is initialized (config and DB exist)
    pub fn is_initialized(&self) -> bool {
        self.paths.config_file.exists() && self.paths.db_file.exists()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.archive.batch_size == 0 {
            return Err(Error::Config(
                "archive.batch_size must be positive".to_string(),
            ));
        }

        if self.archive.cutoff_days <= 0 {
            return Err(Error::Config(
                "archive.cutoff_days must be positive".to_string(),
            ));
        }

        if self.archive.max_batch_attempts == 0 {
            return Err(Error::Config(
                "archive.max_batch_attempts must be at least 1".to_string(),
            ));
        }

        if self.search.min_query_len == 0 || self.search.min_query_len > self.search.max_query_len
        {
            return Err(Error::Config(
                "search.min_query_len must be positive and <= search.max_query_len".to_string(),
            ));
        }

        if self.search.max_results == 0 {
            return Err(Error::Config(
                "search.max_results must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.archive.batch_size, 1000);
        assert_eq!(config.archive.cutoff_days, 90);
    }

    #[test]
    fn test_roundtrip_save_load() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.init_paths(Some(tmp.path().to_path_buf()));
        config.archive.batch_size = 250;
        config.save().unwrap();

        let loaded = Config::load(&config.paths.config_file).unwrap();
        assert_eq!(loaded.archive.batch_size, 250);
        assert_eq!(loaded.paths.archive_dir, tmp.path().join("archive"));
    }

    #[test]
    fn test_load_without_config_file_reports_not_initialized() {
        let tmp = TempDir::new().unwrap();
        let err = Config::load(&tmp.path().join("config.toml")).unwrap_err();
        assert!(matches!(err, crate::error::Error::NotInitialized));
    }

    #[test]
    fn test_invalid_batch_size_rejected() {
        let mut config = Config::default();
        config.archive.batch_size = 0;
        assert!(config.validate().is_err());
    }
}
