//! Session facade: one method per ipset subcommand

use crate::command::IpsetCommand;
use crate::config::{ErrorPolicy, SessionConfig};
use crate::dump;
use crate::error::{IpsetError, Result};
use crate::model::{Members, SetDescriptor};
use crate::options::{CreateOptions, EntryOptions, RestoreOptions, SaveOptions};
use crate::parser::{self, ListingFormat};
use crate::runner::CommandRunner;
use crate::set_type::SetType;

use std::path::Path;
use std::time::{Duration, Instant};

/// A handle on the ipset tool
///
/// Holds the tool's version, the cached list of set names and details of the
/// last command. Methods take `&mut self`, so one session runs one command at
/// a time.
///
/// With [`ErrorPolicy::Sentinel`] failed operations return `false`, an empty
/// collection or `None`, and the error is kept in [`Session::last_error`].
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    runner: CommandRunner,
    format: ListingFormat,
    version: String,
    protocol: u32,
    set_names: Vec<String>,
    last_elapsed: Duration,
    last_output: String,
    last_error: Option<IpsetError>,
}

impl Session {
    /// Query the tool version and current set names
    ///
    /// Fails regardless of the error policy if the tool is missing or speaks
    /// an unsupported protocol.
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let runner = CommandRunner::new(config.command.clone(), config.timeout);
        let mut session = Self {
            config,
            runner,
            format: ListingFormat::Protocol7,
            version: String::new(),
            protocol: 0,
            set_names: Vec::new(),
            last_elapsed: Duration::ZERO,
            last_output: String::new(),
            last_error: None,
        };

        session.get_ipset_version().await?;
        session.get_set_names().await?;

        tracing::debug!(
            "Connected to ipset v{} (protocol {}), {} sets",
            session.version,
            session.protocol,
            session.set_names.len()
        );
        Ok(session)
    }

    /// Version of this library
    pub fn ezset_version() -> &'static str {
        crate::VERSION
    }

    /// ipset version, e.g. "7.15"
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Kernel protocol version, 6 or 7
    pub fn protocol(&self) -> u32 {
        self.protocol
    }

    /// Set names as of the last refresh
    pub fn set_names(&self) -> &[String] {
        &self.set_names
    }

    pub fn last_elapsed(&self) -> Duration {
        self.last_elapsed
    }

    /// Elapsed time of the last operation in seconds, with the configured
    /// number of decimal places
    pub fn last_elapsed_display(&self) -> String {
        format!(
            "{:.*}",
            self.config.elapsed_decimal_places,
            self.last_elapsed.as_secs_f64()
        )
    }

    /// Output of the last command (stdout on success, stderr on failure)
    pub fn last_output(&self) -> &str {
        &self.last_output
    }

    /// Error swallowed by the last operation
    pub fn last_error(&self) -> Option<&IpsetError> {
        self.last_error.as_ref()
    }

    /// Run one command, recording its output and (optionally) elapsed time
    ///
    /// A call that times out or fails to start records the time spent and
    /// the error text as its output.
    async fn run(&mut self, command: IpsetCommand, record_elapsed: bool) -> Result<String> {
        let start = Instant::now();
        let result = match self.runner.run(&command).await {
            Ok(result) => result,
            Err(e) => {
                if record_elapsed {
                    self.last_elapsed = start.elapsed();
                }
                self.last_output = e.to_string();
                return Err(e);
            }
        };

        if record_elapsed {
            self.last_elapsed = result.elapsed;
        }
        self.last_output = result.output.clone();
        if self.config.verbose {
            tracing::debug!("Output: {}", result.output);
        }

        if result.success {
            Ok(result.output)
        } else {
            Err(IpsetError::CommandFailed {
                command: format!("{} {}", self.runner.program(), command),
                stderr: result.output,
            })
        }
    }

    async fn execute(&mut self, command: IpsetCommand) -> Result<String> {
        self.run(command, true).await
    }

    /// Apply the error policy to an operation's result
    fn settle<T>(&mut self, result: Result<T>, sentinel: T) -> Result<T> {
        match result {
            Ok(value) => {
                self.last_error = None;
                Ok(value)
            }
            Err(e) => match self.config.error_policy {
                ErrorPolicy::Raise => Err(e),
                ErrorPolicy::Sentinel => {
                    tracing::warn!("{}", e);
                    self.last_error = Some(e);
                    Ok(sentinel)
                }
            },
        }
    }

    fn finish_timer(&mut self, start: Instant) {
        self.last_elapsed = start.elapsed();
    }

    /// Refresh the cached names without touching the elapsed time
    async fn refresh_set_names(&mut self) {
        match self.run(IpsetCommand::new("list").arg("-name"), false).await {
            Ok(output) => self.set_names = parser::parse_set_names(&output),
            Err(e) => {
                tracing::warn!("Failed to refresh set names: {}", e);
                self.set_names.clear();
            }
        }
    }

    /// Re-read `ipset --version`; always fails on error
    pub async fn get_ipset_version(&mut self) -> Result<String> {
        let output = self.execute(IpsetCommand::new("--version")).await?;
        let (version, protocol) = parser::parse_version(&output)?;

        self.format = ListingFormat::from_protocol(protocol)
            .map_err(|_| IpsetError::UnsupportedProtocol(output.clone()))?;
        self.version = version;
        self.protocol = protocol;
        Ok(output)
    }

    /// List all set names and refresh the cache
    pub async fn get_set_names(&mut self) -> Result<Vec<String>> {
        let result = self
            .execute(IpsetCommand::new("list").arg("-name"))
            .await
            .map(|output| parser::parse_set_names(&output));

        if let Ok(names) = &result {
            self.set_names = names.clone();
        }
        self.settle(result, Vec::new())
    }

    /// Create a set after checking its options against the set type
    pub async fn create_set(
        &mut self,
        name: &str,
        set_type: SetType,
        opts: &CreateOptions,
    ) -> Result<bool> {
        let start = Instant::now();
        let result = match opts.validate(set_type) {
            Ok(()) => self.execute(opts.to_command(name, set_type)).await,
            Err(e) => Err(e),
        };

        if result.is_ok() {
            tracing::info!("Created {} set {}", set_type, name);
            self.refresh_set_names().await;
        } else {
            self.finish_timer(start);
        }
        self.settle(result.map(|_| true), false)
    }

    /// Destroy one set
    pub async fn destroy_set(&mut self, name: &str) -> Result<bool> {
        let result = self.execute(IpsetCommand::new("destroy").arg(name)).await;
        self.refresh_set_names().await;

        if result.is_ok() {
            tracing::info!("Destroyed set {}", name);
        }
        self.settle(result.map(|_| true), false)
    }

    /// Destroy every known set, one command per set
    ///
    /// A name leaves the cache only once its destroy succeeded. Returns true
    /// when every set was destroyed.
    pub async fn destroy_all(&mut self) -> Result<bool> {
        let start = Instant::now();
        let names = self.get_set_names().await?;
        if self.last_error.is_some() {
            self.finish_timer(start);
            return Ok(false);
        }
        let mut all_destroyed = true;

        for name in names {
            let result = self.execute(IpsetCommand::new("destroy").arg(&name)).await;
            match result {
                Ok(_) => self.set_names.retain(|n| n != &name),
                Err(e) => {
                    all_destroyed = false;
                    if let Err(e) = self.settle(Err(e), ()) {
                        self.finish_timer(start);
                        return Err(e);
                    }
                }
            }
        }

        self.finish_timer(start);
        Ok(all_destroyed)
    }

    pub async fn rename_set(&mut self, old_name: &str, new_name: &str) -> Result<bool> {
        let result = self
            .execute(IpsetCommand::new("rename").arg(old_name).arg(new_name))
            .await;

        if result.is_ok() {
            self.refresh_set_names().await;
        }
        self.settle(result.map(|_| true), false)
    }

    /// Swap the contents of two compatible sets
    pub async fn swap_set(&mut self, from: &str, to: &str) -> Result<bool> {
        let result = self
            .execute(IpsetCommand::new("swap").arg(from).arg(to))
            .await;
        self.settle(result.map(|_| true), false)
    }

    /// Remove all entries from a set
    pub async fn flush_set(&mut self, name: &str) -> Result<bool> {
        let result = self.execute(IpsetCommand::new("flush").arg(name)).await;
        self.settle(result.map(|_| true), false)
    }

    /// Remove all entries from every set
    pub async fn flush_all(&mut self, ignore_errors: bool) -> Result<bool> {
        match self.execute(IpsetCommand::new("flush")).await {
            Ok(_) => self.settle(Ok(true), false),
            Err(e) if ignore_errors => {
                tracing::debug!("Ignoring flush failure: {}", e);
                self.last_error = Some(e);
                Ok(false)
            }
            Err(e) => self.settle(Err(e), false),
        }
    }

    /// Every set, optionally with members
    pub async fn get_all_sets(
        &mut self,
        with_members: bool,
        sorted: bool,
    ) -> Result<Vec<SetDescriptor>> {
        let start = Instant::now();
        let names = self.get_set_names().await?;
        let mut sets = Vec::with_capacity(names.len());
        let mut first_error = None;

        // Under the sentinel policy a failed set is skipped and the first
        // failure stays in last_error
        for name in names {
            match self.fetch_set(&name, with_members, sorted).await {
                Ok(set) => sets.push(set),
                Err(e) if self.config.error_policy == ErrorPolicy::Sentinel => {
                    tracing::warn!("Skipping set {}: {}", name, e);
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    self.finish_timer(start);
                    return Err(e);
                }
            }
        }

        self.finish_timer(start);
        if first_error.is_some() {
            self.last_error = first_error;
        }
        Ok(sets)
    }

    /// Header of a set, optionally with its members attached
    pub async fn get_set(
        &mut self,
        name: &str,
        with_members: bool,
        sorted: bool,
    ) -> Result<Option<SetDescriptor>> {
        let start = Instant::now();
        let result = self.fetch_set(name, with_members, sorted).await;
        self.finish_timer(start);
        self.settle(result.map(Some), None)
    }

    async fn fetch_set(
        &mut self,
        name: &str,
        with_members: bool,
        sorted: bool,
    ) -> Result<SetDescriptor> {
        let mut set = self.fetch_header(name).await?;
        if with_members {
            set.members = Some(self.fetch_members(name, sorted).await?);
        }
        Ok(set)
    }

    /// Header of a set from `ipset list <set> -terse` (the full listing on protocol 6)
    pub async fn get_set_header(&mut self, name: &str) -> Result<Option<SetDescriptor>> {
        let result = self.fetch_header(name).await;
        self.settle(result.map(Some), None)
    }

    /// Protocol 6 listings carry no entry count, so the header is read from
    /// the full listing and the member lines are counted instead
    async fn fetch_header(&mut self, name: &str) -> Result<SetDescriptor> {
        let terse = self.format == ListingFormat::Protocol7;
        let output = self
            .execute(IpsetCommand::new("list").arg(name).flag("-terse", terse))
            .await?;
        parser::parse_header(&output, self.format)
    }

    /// Entries of a set, keyed by member
    pub async fn get_set_members(&mut self, name: &str, sorted: bool) -> Result<Members> {
        let result = self.fetch_members(name, sorted).await;
        self.settle(result, Members::new())
    }

    async fn fetch_members(&mut self, name: &str, sorted: bool) -> Result<Members> {
        let output = self
            .execute(IpsetCommand::new("list").arg(name).flag("-sorted", sorted))
            .await?;
        parser::parse_members(&output)
    }

    /// Add an entry to a set
    pub async fn add_entry(
        &mut self,
        set_name: &str,
        entry: &str,
        opts: &EntryOptions,
        ignore_if_exists: bool,
    ) -> Result<bool> {
        let start = Instant::now();
        let result = match opts.validate() {
            Ok(()) => {
                self.execute(opts.to_command(set_name, entry, ignore_if_exists))
                    .await
            }
            Err(e) => Err(e),
        };
        self.finish_timer(start);
        self.settle(result.map(|_| true), false)
    }

    /// Test whether an entry is in a set
    ///
    /// A negative answer is `Ok(false)`; it is only an error when
    /// `raise_on_test_failed` is set and the policy is [`ErrorPolicy::Raise`].
    pub async fn test_entry(
        &mut self,
        set_name: &str,
        entry: &str,
        raise_on_test_failed: bool,
    ) -> Result<bool> {
        let result = self
            .execute(IpsetCommand::new("test").arg(set_name).arg(entry))
            .await;
        self.settle_expected_failure(result, raise_on_test_failed)
    }

    /// Delete an entry from a set
    ///
    /// A missing entry is `Ok(false)` unless `raise_if_not_exists` is set and
    /// the policy is [`ErrorPolicy::Raise`].
    pub async fn del_entry(
        &mut self,
        set_name: &str,
        entry: &str,
        ignore_if_not_exists: bool,
        raise_if_not_exists: bool,
    ) -> Result<bool> {
        let result = self
            .execute(
                IpsetCommand::new("del")
                    .arg(set_name)
                    .arg(entry)
                    .exist(ignore_if_not_exists),
            )
            .await;
        self.settle_expected_failure(result, raise_if_not_exists)
    }

    /// Tool-reported failures are an answer, not an error, unless `raise` is set
    fn settle_expected_failure(&mut self, result: Result<String>, raise: bool) -> Result<bool> {
        match result {
            Err(e) if e.is_tool_failure() && !raise => {
                tracing::debug!("{}", e);
                self.last_error = Some(e);
                Ok(false)
            }
            other => self.settle(other.map(|_| true), false),
        }
    }

    /// Full state dump as printed by `ipset save`
    pub async fn save(&mut self) -> Result<Option<String>> {
        let result = self.execute(IpsetCommand::new("save")).await;
        self.settle(result.map(Some), None)
    }

    /// Write `ipset save` output to a file, optionally gzip-compressed
    ///
    /// An existing file is left untouched unless `opts.overwrite` is set.
    pub async fn save_to_file(&mut self, path: &Path, opts: &SaveOptions) -> Result<bool> {
        let result = self.save_into(path, opts).await;
        self.settle(result.map(|_| true), false)
    }

    async fn save_into(&mut self, path: &Path, opts: &SaveOptions) -> Result<()> {
        opts.validate()?;

        let (target, gzip) = dump::save_target(path, opts.gzip);
        if !opts.overwrite && target.exists() {
            return Err(IpsetError::FileExists(target));
        }

        let output = self.execute(IpsetCommand::new("save")).await?;
        dump::write_dump(&target, gzip, &output, opts)?;

        tracing::info!("Saved ipset rules to {}", target.display());
        Ok(())
    }

    /// Restore sets and entries from a (possibly gzip-compressed) dump file
    pub async fn restore(&mut self, path: &Path, opts: &RestoreOptions) -> Result<bool> {
        let result = self.restore_from(path, opts).await;
        self.settle(result.map(|_| true), false)
    }

    async fn restore_from(&mut self, path: &Path, opts: &RestoreOptions) -> Result<()> {
        let input = dump::prepare_restore(path, opts)?;

        let command = IpsetCommand::new("restore")
            .exist(opts.ignore_if_exists)
            .arg("-file")
            .arg(input.path().to_string_lossy());
        let result = self.execute(command).await;

        // Removes the temporary copy, if any
        drop(input);
        self.refresh_set_names().await;

        result?;
        tracing::info!("Restored ipset rules from {}", path.display());
        Ok(())
    }
}
