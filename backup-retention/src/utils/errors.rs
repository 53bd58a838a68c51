//! Error types for retention planning and archive codec selection.

use thiserror::Error;

/// Failures raised while selecting or driving an archive codec.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("wrong compression_format: {format}, supported: {}", quoted_list(.supported))]
    UnsupportedFormat {
        format: String,
        supported: &'static [&'static str],
    },

    #[error("Compression stream error: {0}")]
    Io(#[from] std::io::Error),
}

/// Integrity problems in incremental backup chains.
///
/// Only produced by [`crate::retention::chain::validate_chains`]; the resolver
/// itself treats these as dead ends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetentionError {
    #[error("Backup {backup} requires {required}, which is not in the listing")]
    DanglingReference { backup: String, required: String },

    #[error("Incremental chain cycle: {}", .0.join(" -> "))]
    DependencyCycle(Vec<String>),
}

/// Top-level error for the retention tool.
#[derive(Error, Debug)]
pub enum RetentionToolError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Retention(#[from] RetentionError),
}

pub type Result<T> = std::result::Result<T, RetentionToolError>;

fn quoted_list(tokens: &[&str]) -> String {
    tokens
        .iter()
        .map(|t| format!("'{}'", t))
        .collect::<Vec<_>>()
        .join(", ")
}
