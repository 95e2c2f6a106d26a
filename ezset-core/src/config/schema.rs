//! Configuration schema types

use serde::{Deserialize, Serialize};

/// Complete application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub common: CommonConfig,
    #[serde(default)]
    pub ipset: IpsetConfig,
}

/// Settings not tied to the ipset tool itself
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CommonConfig {
    #[serde(default = "default_config_version")]
    pub config_version: String,
    #[serde(default)]
    pub verbose: bool,
}

fn default_config_version() -> String {
    "1.0".to_string()
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            verbose: false,
        }
    }
}

/// How the ipset executable is invoked
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IpsetConfig {
    /// Executable name or path
    #[serde(default = "default_command")]
    pub command: String,
    /// Per-command timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Return errors (true) or sentinel values (false) on failure
    #[serde(default = "default_raise_on_errors")]
    pub raise_on_errors: bool,
    /// Decimal places used when displaying elapsed time
    #[serde(default = "default_elapsed_decimal_places")]
    pub elapsed_decimal_places: usize,
}

fn default_command() -> String {
    "ipset".to_string()
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_raise_on_errors() -> bool {
    true
}

fn default_elapsed_decimal_places() -> usize {
    9
}

impl Default for IpsetConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            timeout_secs: default_timeout_secs(),
            raise_on_errors: default_raise_on_errors(),
            elapsed_decimal_places: default_elapsed_decimal_places(),
        }
    }
}
