//! Runtime configuration of an ipset session

use super::schema::Config;
use std::time::Duration;

/// What a failed operation hands back to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Return the error
    #[default]
    Raise,

    /// Record the error and return the operation's failure value
    /// (`false`, an empty collection or `None`)
    Sentinel,
}

/// Complete session configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// ipset executable name or path
    pub command: String,

    /// Timeout applied to every invocation
    pub timeout: Duration,

    pub error_policy: ErrorPolicy,

    /// Decimal places of [`Session::last_elapsed_display`](crate::Session::last_elapsed_display)
    pub elapsed_decimal_places: usize,

    /// Log every command and its output at debug level
    pub verbose: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for SessionConfig {
    fn from(config: &Config) -> Self {
        Self {
            command: config.ipset.command.clone(),
            timeout: Duration::from_secs(config.ipset.timeout_secs),
            error_policy: if config.ipset.raise_on_errors {
                ErrorPolicy::Raise
            } else {
                ErrorPolicy::Sentinel
            },
            elapsed_decimal_places: config.ipset.elapsed_decimal_places,
            verbose: config.common.verbose,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.command, "ipset");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.error_policy, ErrorPolicy::Raise);
        assert_eq!(config.elapsed_decimal_places, 9);
        assert!(!config.verbose);
    }

    #[test]
    fn test_sentinel_from_config() {
        let mut config = Config::default();
        config.ipset.raise_on_errors = false;
        config.ipset.timeout_secs = 2;

        let session = SessionConfig::from(&config);
        assert_eq!(session.error_policy, ErrorPolicy::Sentinel);
        assert_eq!(session.timeout, Duration::from_secs(2));
    }
}
