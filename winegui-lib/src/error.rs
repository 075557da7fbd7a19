//! Error types for WineGUI

use std::path::PathBuf;
use thiserror::Error;

/// WineGUI result type
pub type Result<T> = std::result::Result<T, WineGuiError>;

/// Main error type for bottle queries
#[derive(Error, Debug)]
pub enum WineGuiError {
    #[error("Could not open file {}: {source}", path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Wine error: {0}")]
    Wine(String),

    #[error("Command execution failed: {command} - {error}")]
    CommandExecution { command: String, error: String },
}

impl WineGuiError {
    /// Build a [`WineGuiError::FileOpen`] for `path`
    pub(crate) fn file_open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WineGuiError::FileOpen {
            path: path.into(),
            source,
        }
    }
}
