//! Error types for ipset operations

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IpsetError>;

#[derive(Debug, Error)]
pub enum IpsetError {
    #[error("ipset executable not found: {0}")]
    CommandNotFound(String),

    #[error("Failed to execute {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("Command timed out after {timeout:?}: {command}")]
    Timeout { command: String, timeout: Duration },

    #[error("{command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("File already exists: {0}")]
    FileExists(PathBuf),

    #[error("Cannot access file: {0}")]
    FileNotFound(PathBuf),

    #[error("Unexpected ipset output ({context}): {output}")]
    Unparseable { context: String, output: String },

    #[error("Unsupported ipset protocol version: {0}")]
    UnsupportedProtocol(String),

    #[error("Failed to load config from {path}: {source}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IpsetError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unparseable(context: impl Into<String>, output: impl Into<String>) -> Self {
        Self::Unparseable {
            context: context.into(),
            output: output.into(),
        }
    }

    /// True when the external tool ran and reported a failure
    pub fn is_tool_failure(&self) -> bool {
        matches!(self, Self::CommandFailed { .. })
    }
}
