//! Execution of the external ipset tool

use crate::command::IpsetCommand;
use crate::error::{IpsetError, Result};

use std::io;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::Command;

/// Outcome of one tool invocation that ran to completion
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    /// Exit status was zero
    pub success: bool,

    /// Trimmed stdout on success, trimmed stderr otherwise
    pub output: String,

    /// Wall-clock time from spawn to exit
    pub elapsed: Duration,
}

/// Runs ipset subcommands as short-lived child processes
#[derive(Debug, Clone)]
pub struct CommandRunner {
    program: String,
    timeout: Duration,
}

impl CommandRunner {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run a command, killing the child if it outlives the timeout
    pub async fn run(&self, command: &IpsetCommand) -> Result<CommandOutput> {
        let rendered = format!("{} {}", self.program, command);
        tracing::debug!("Running command: {}", rendered);

        let start = Instant::now();
        let mut child = Command::new(&self.program)
            .args(command.to_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| match source.kind() {
                io::ErrorKind::NotFound => IpsetError::CommandNotFound(self.program.clone()),
                _ => IpsetError::Spawn {
                    command: rendered.clone(),
                    source,
                },
            })?;

        let (Some(mut stdout), Some(mut stderr)) = (child.stdout.take(), child.stderr.take())
        else {
            return Err(IpsetError::Spawn {
                command: rendered,
                source: io::Error::new(io::ErrorKind::BrokenPipe, "child pipes unavailable"),
            });
        };

        let mut out = Vec::new();
        let mut err = Vec::new();
        let waited = tokio::time::timeout(self.timeout, async {
            tokio::try_join!(
                child.wait(),
                stdout.read_to_end(&mut out),
                stderr.read_to_end(&mut err)
            )
        })
        .await;

        let status = match waited {
            Ok(Ok((status, _, _))) => status,
            Ok(Err(source)) => {
                return Err(IpsetError::Spawn {
                    command: rendered,
                    source,
                })
            }
            Err(_) => {
                if let Err(e) = child.kill().await {
                    tracing::warn!("Failed to kill timed out command {}: {}", rendered, e);
                }
                return Err(IpsetError::Timeout {
                    command: rendered,
                    timeout: self.timeout,
                });
            }
        };

        let elapsed = start.elapsed();
        let success = status.success();
        let output = String::from_utf8_lossy(if success { &out } else { &err })
            .trim()
            .to_string();

        tracing::debug!(
            "Command finished in {:?} (exit {:?}): {}",
            elapsed,
            status.code(),
            rendered
        );

        Ok(CommandOutput {
            success,
            output,
            elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(script: &str) -> IpsetCommand {
        IpsetCommand::new("-c").arg(script)
    }

    #[tokio::test]
    async fn test_success_returns_stdout() {
        let runner = CommandRunner::new("sh", Duration::from_secs(5));
        let result = runner.run(&shell("echo '  hello  '; echo ignored >&2")).await.unwrap();

        assert!(result.success);
        assert_eq!(result.output, "hello");
    }

    #[tokio::test]
    async fn test_failure_returns_stderr() {
        let runner = CommandRunner::new("sh", Duration::from_secs(5));
        let result = runner
            .run(&shell("echo out; echo 'Element cannot be added' >&2; exit 1"))
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.output, "Element cannot be added");
    }

    #[tokio::test]
    async fn test_timeout_kills_child() {
        let runner = CommandRunner::new("sh", Duration::from_millis(200));
        let start = Instant::now();
        let err = runner.run(&shell("sleep 10")).await.unwrap_err();

        assert!(matches!(err, IpsetError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let runner = CommandRunner::new("/nonexistent/ipset-binary", Duration::from_secs(1));
        let err = runner.run(&IpsetCommand::new("--version")).await.unwrap_err();

        assert!(matches!(err, IpsetError::CommandNotFound(_)));
    }
}
