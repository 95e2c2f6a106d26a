//! Core library for driving the ipset tool
//!
//! Builds ipset command lines from typed parameters, runs them with a
//! timeout and parses the tool's listings into structured records.

pub mod args;
pub mod command;
pub mod config;
pub mod dump;
pub mod error;
pub mod model;
pub mod options;
pub mod parser;
pub mod runner;
pub mod session;
pub mod set_type;

pub use args::CommonArgs;
pub use command::IpsetCommand;
pub use config::{Config, ConfigLoader, ErrorPolicy, SessionConfig};
pub use error::{IpsetError, Result};
pub use model::{AttrValue, EntryAttrs, Members, SetDescriptor};
pub use options::{CreateOptions, EntryOptions, RestoreOptions, SaveOptions};
pub use runner::{CommandOutput, CommandRunner};
pub use session::Session;
pub use set_type::{Family, Feature, SetType};

/// Version of the ezset library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
