//! Error types for the harness

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Catalog file {path}: {reason}")]
    CatalogFile { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Browser session unusable before page '{page}': {reason}")]
    SessionLost { page: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML encode error: {0}")]
    TomlEncode(#[from] toml::ser::Error),
}

pub type HarnessResult<T> = Result<T, HarnessError>;
