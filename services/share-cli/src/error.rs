//! CLI error types

use thiserror::Error;

/// Configuration loading and validation failures.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result alias using the CLI Error
pub type Result<T> = std::result::Result<T, Error>;
