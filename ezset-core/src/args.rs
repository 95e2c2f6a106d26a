//! Common CLI argument structure for ezset front ends

use crate::config::{ConfigLoader, ErrorPolicy, SessionConfig};
use crate::error::Result;
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

/// Session options shared by all ezset executables
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Configuration file (TOML format)
    #[arg(long, short = 'c', value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// ipset executable to run (default: ipset)
    #[arg(long, value_name = "CMD", env = "EZSET_IPSET_COMMAND", global = true)]
    pub ipset_command: Option<String>,

    /// Per-command timeout in seconds (default: 5)
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    /// Report failures as false/empty results instead of errors
    #[arg(long, global = true)]
    pub sentinel: bool,

    /// Log every ipset command and its output to stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

impl CommonArgs {
    /// Load the layered config file and apply command-line overrides
    pub fn session_config(&self) -> Result<SessionConfig> {
        let config = ConfigLoader::load_or_default(self.config.clone())?;
        let mut session = SessionConfig::from(&config);

        if let Some(command) = &self.ipset_command {
            session.command = command.clone();
        }
        if let Some(secs) = self.timeout {
            session.timeout = Duration::from_secs(secs);
        }
        if self.sentinel {
            session.error_policy = ErrorPolicy::Sentinel;
        }
        session.verbose |= self.verbose;

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        common: CommonArgs,
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[ipset]\ncommand = \"/sbin/ipset\"\ntimeout_secs = 9\n").unwrap();

        let cli = TestCli::parse_from([
            "test",
            "--config",
            path.to_str().unwrap(),
            "--timeout",
            "2",
            "--sentinel",
        ]);
        let session = cli.common.session_config().unwrap();

        assert_eq!(session.command, "/sbin/ipset");
        assert_eq!(session.timeout, Duration::from_secs(2));
        assert_eq!(session.error_policy, ErrorPolicy::Sentinel);
    }
}
