//! Command-line front end for managing ipset sets

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use ezset_core::{
    CommonArgs, CreateOptions, EntryOptions, Family, RestoreOptions, SaveOptions, Session,
    SetType,
};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ezset", about = "Manage ipset sets with structured output", version)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print ipset and ezset versions
    Version,

    /// List set names
    Names,

    /// Show every set as JSON
    List {
        /// Omit the members of each set
        #[arg(long)]
        headers_only: bool,

        /// Ask ipset to sort the members
        #[arg(long)]
        sorted: bool,
    },

    /// Show one set as JSON
    Show {
        name: String,

        /// Omit the members
        #[arg(long)]
        headers_only: bool,

        /// Ask ipset to sort the members
        #[arg(long)]
        sorted: bool,
    },

    /// Create a set
    Create(CreateArgs),

    /// Destroy a set
    Destroy { name: String },

    /// Destroy every set, one at a time
    DestroyAll,

    /// Rename a set
    Rename { old_name: String, new_name: String },

    /// Swap the contents of two sets
    Swap { from: String, to: String },

    /// Flush one set, or every set when no name is given
    Flush {
        name: Option<String>,

        /// Don't fail when flushing every set fails
        #[arg(long)]
        ignore_errors: bool,
    },

    /// Add an entry to a set
    Add(AddArgs),

    /// Delete an entry from a set
    Del {
        set: String,
        entry: String,

        /// Don't fail if the entry is missing (-exist)
        #[arg(long)]
        exist: bool,
    },

    /// Test whether an entry is in a set (exit status 1 if not)
    Test { set: String, entry: String },

    /// Dump all sets to stdout or a file
    Save {
        /// Write to this file instead of stdout
        #[arg(long, short, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Gzip the file (implied by a .gz path)
        #[arg(long)]
        gzip: bool,

        /// Gzip compression level, 0-9
        #[arg(long, default_value_t = 9)]
        level: u32,

        /// Replace an existing file
        #[arg(long)]
        overwrite: bool,
    },

    /// Restore sets from a dump file (.gz accepted)
    Restore {
        file: PathBuf,

        /// Skip `create` lines
        #[arg(long)]
        skip_create: bool,

        /// Skip `add` lines
        #[arg(long)]
        skip_add: bool,

        /// Don't fail on existing sets and entries (-exist)
        #[arg(long)]
        exist: bool,
    },
}

#[derive(ClapArgs)]
struct CreateArgs {
    name: String,

    /// Set type, e.g. hash:ip or hash:net,port
    #[arg(value_name = "TYPE")]
    set_type: SetType,

    /// inet or inet6 (hash types only)
    #[arg(long)]
    family: Option<Family>,

    /// Default entry timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    #[arg(long)]
    hashsize: Option<u64>,

    #[arg(long)]
    maxelem: Option<u64>,

    #[arg(long)]
    bucketsize: Option<u64>,

    /// Range for bitmap types
    #[arg(long)]
    range: Option<String>,

    /// Size of a list:set
    #[arg(long)]
    size: Option<u64>,

    #[arg(long)]
    comment: bool,

    #[arg(long)]
    counters: bool,

    #[arg(long)]
    skbinfo: bool,

    #[arg(long)]
    nomatch: bool,

    #[arg(long)]
    forceadd: bool,

    #[arg(long)]
    wildcard: bool,

    /// Don't fail if the set already exists (-exist)
    #[arg(long)]
    exist: bool,
}

impl From<CreateArgs> for CreateOptions {
    fn from(args: CreateArgs) -> Self {
        CreateOptions {
            family: args.family,
            timeout: args.timeout,
            hashsize: args.hashsize,
            maxelem: args.maxelem,
            bucketsize: args.bucketsize,
            range: args.range,
            size: args.size,
            comment: args.comment,
            counters: args.counters,
            skbinfo: args.skbinfo,
            nomatch: args.nomatch,
            forceadd: args.forceadd,
            wildcard: args.wildcard,
            ignore_if_exists: args.exist,
        }
    }
}

#[derive(ClapArgs)]
struct AddArgs {
    set: String,
    entry: String,

    #[arg(long)]
    timeout: Option<u64>,

    #[arg(long)]
    comment: Option<String>,

    #[arg(long)]
    packets: Option<u64>,

    #[arg(long)]
    bytes: Option<u64>,

    /// e.g. 0x1111/0xff00ffff
    #[arg(long)]
    skbmark: Option<String>,

    /// e.g. 1:10
    #[arg(long)]
    skbprio: Option<String>,

    #[arg(long)]
    skbqueue: Option<u64>,

    /// Don't fail if the entry already exists (-exist)
    #[arg(long)]
    exist: bool,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

fn report(done: bool, what: &str) -> Result<()> {
    if !done {
        anyhow::bail!("{} failed", what);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let session_config = args
        .common
        .session_config()
        .context("Failed to load configuration")?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(if session_config.verbose { "debug" } else { "warn" })
        .with_writer(std::io::stderr)
        .init();

    let mut session = Session::connect(session_config)
        .await
        .context("Failed to start ipset session")?;

    match args.command {
        Command::Version => {
            println!("ipset v{}, protocol version: {}", session.version(), session.protocol());
            println!("ezset v{}", Session::ezset_version());
        }
        Command::Names => {
            for name in session.get_set_names().await? {
                println!("{}", name);
            }
        }
        Command::List {
            headers_only,
            sorted,
        } => {
            let sets = session.get_all_sets(!headers_only, sorted).await?;
            print_json(&sets)?;
        }
        Command::Show {
            name,
            headers_only,
            sorted,
        } => match session.get_set(&name, !headers_only, sorted).await? {
            Some(set) => print_json(&set)?,
            None => anyhow::bail!("Failed to list set {}", name),
        },
        Command::Create(create) => {
            let name = create.name.clone();
            let set_type = create.set_type;
            let done = session
                .create_set(&name, set_type, &create.into())
                .await?;
            report(done, "create")?;
        }
        Command::Destroy { name } => {
            report(session.destroy_set(&name).await?, "destroy")?;
        }
        Command::DestroyAll => {
            report(session.destroy_all().await?, "destroy-all")?;
        }
        Command::Rename { old_name, new_name } => {
            report(session.rename_set(&old_name, &new_name).await?, "rename")?;
        }
        Command::Swap { from, to } => {
            report(session.swap_set(&from, &to).await?, "swap")?;
        }
        Command::Flush {
            name: Some(name), ..
        } => {
            report(session.flush_set(&name).await?, "flush")?;
        }
        Command::Flush {
            name: None,
            ignore_errors,
        } => {
            let done = session.flush_all(ignore_errors).await?;
            if !ignore_errors {
                report(done, "flush")?;
            }
        }
        Command::Add(add) => {
            let opts = EntryOptions {
                timeout: add.timeout,
                comment: add.comment,
                packets: add.packets,
                bytes: add.bytes,
                skbmark: add.skbmark,
                skbprio: add.skbprio,
                skbqueue: add.skbqueue,
            };
            let done = session
                .add_entry(&add.set, &add.entry, &opts, add.exist)
                .await?;
            report(done, "add")?;
        }
        Command::Del { set, entry, exist } => {
            let done = session.del_entry(&set, &entry, exist, true).await?;
            report(done, "del")?;
        }
        Command::Test { set, entry } => {
            let found = session.test_entry(&set, &entry, false).await?;
            println!("{}", session.last_output());
            if !found {
                std::process::exit(1);
            }
        }
        Command::Save {
            output: None, ..
        } => match session.save().await? {
            Some(dump) => println!("{}", dump),
            None => anyhow::bail!("save failed"),
        },
        Command::Save {
            output: Some(path),
            gzip,
            level,
            overwrite,
        } => {
            let opts = SaveOptions {
                gzip,
                compression_level: level,
                overwrite,
            };
            report(session.save_to_file(&path, &opts).await?, "save")?;
        }
        Command::Restore {
            file,
            skip_create,
            skip_add,
            exist,
        } => {
            let opts = RestoreOptions {
                skip_create_sets: skip_create,
                skip_add_entries: skip_add,
                ignore_if_exists: exist,
            };
            report(session.restore(&file, &opts).await?, "restore")?;
        }
    }

    tracing::debug!("Completed in {}s", session.last_elapsed_display());
    Ok(())
}
