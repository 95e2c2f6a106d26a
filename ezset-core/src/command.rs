//! Argument building for a single ipset invocation

use std::ffi::OsString;
use std::fmt;

/// Builder for the arguments of one ipset subcommand
///
/// Values are kept as separate argv entries, so comments with spaces need no
/// shell quoting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IpsetCommand {
    args: Vec<String>,
}

impl IpsetCommand {
    /// Start a command with the given subcommand (e.g. "create", "list")
    pub fn new(subcommand: impl Into<String>) -> Self {
        Self {
            args: vec![subcommand.into()],
        }
    }

    /// Append a positional argument
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Append `key value` when the value is set
    pub fn opt<V: ToString>(mut self, key: &str, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.args.push(key.to_string());
            self.args.push(value.to_string());
        }
        self
    }

    /// Append a bare keyword when enabled
    pub fn flag(mut self, key: &str, enabled: bool) -> Self {
        if enabled {
            self.args.push(key.to_string());
        }
        self
    }

    /// Append `-exist` when enabled
    pub fn exist(self, enabled: bool) -> Self {
        self.flag("-exist", enabled)
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Convert to process arguments
    pub fn to_args(&self) -> Vec<OsString> {
        self.args.iter().map(OsString::from).collect()
    }
}

impl fmt::Display for IpsetCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .args
            .iter()
            .map(|arg| shlex::try_quote(arg).map_or_else(|_| arg.clone(), |q| q.into_owned()))
            .collect();
        f.write_str(&rendered.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_options_are_omitted() {
        let cmd = IpsetCommand::new("add")
            .arg("blocklist")
            .arg("10.0.0.1")
            .opt("timeout", Some(300))
            .opt::<u64>("packets", None)
            .flag("counters", false)
            .exist(true);

        assert_eq!(
            cmd.args(),
            &["add", "blocklist", "10.0.0.1", "timeout", "300", "-exist"]
        );
    }

    #[test]
    fn test_display_quotes_spaces() {
        let cmd = IpsetCommand::new("add")
            .arg("blocklist")
            .arg("10.0.0.1")
            .opt("comment", Some("office printer"));

        let rendered = cmd.to_string();
        assert!(rendered.starts_with("add blocklist 10.0.0.1 comment "));
        assert_ne!(rendered, "add blocklist 10.0.0.1 comment office printer");
        assert_eq!(
            shlex::split(&rendered).unwrap(),
            vec!["add", "blocklist", "10.0.0.1", "comment", "office printer"]
        );
        assert_eq!(cmd.to_args().len(), 5);
    }
}
