// src/errors.rs

//! Crate-wide error type for configuration and CLI plumbing.
//!
//! Task failures themselves are [`crate::event::TaskError`] and never pass
//! through here.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskstreamError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TaskstreamError>;
