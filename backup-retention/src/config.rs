//! Configuration management for the retention tool.
//!
//! Loads configuration from a TOML file; missing sections fall back to defaults.

use crate::codec::ArchiveFormat;
use crate::utils::errors::{Result, RetentionToolError};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub compression: CompressionConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Number of most recent remote backups to keep (0 disables pruning)
    #[serde(default)]
    pub keep_remote: usize,

    /// Refuse to plan deletions when incremental chains are broken
    #[serde(default)]
    pub strict_chains: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    /// Archive format token (tar, lz4, bzip2, bz2, gzip, gz, sz, xz, br, brotli, zstd)
    #[serde(default = "default_compression_format")]
    pub format: String,

    /// Compression level, range depends on the format
    #[serde(default = "default_compression_level")]
    pub level: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values
fn default_compression_format() -> String {
    "tar".to_string()
}

fn default_compression_level() -> i32 {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            format: default_compression_format(),
            level: default_compression_level(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would only fail later, once archive I/O has started.
    pub fn validate(&self) -> Result<()> {
        self.archive_format()?;
        if self.log.level.trim().is_empty() {
            return Err(RetentionToolError::Config("log.level must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn archive_format(&self) -> Result<ArchiveFormat> {
        Ok(self.compression.format.parse()?)
    }

    /// Apply a command-line `keep` override, if any.
    pub fn with_keep_override(mut self, keep: Option<usize>) -> Self {
        if let Some(keep) = keep {
            self.retention.keep_remote = keep;
        }
        self
    }

    /// Pruning is disabled when no backups are configured to be kept.
    pub fn retention_enabled(&self) -> bool {
        self.retention.keep_remote > 0
    }
}
