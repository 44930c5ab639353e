use std::path::PathBuf;
use thiserror::Error;

/// Core error type for npmirror configuration and setup.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config value for {key}: {message}")]
    ConfigValue { key: &'static str, message: String },
}
