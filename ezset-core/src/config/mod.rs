//! Configuration system for ezset
//!
//! - Config: TOML file schema, layered by ConfigLoader
//! - SessionConfig: Runtime configuration of a Session

pub mod loader;
pub mod schema;
pub mod session;

// Re-export commonly used types
pub use loader::ConfigLoader;
pub use schema::{CommonConfig, Config, IpsetConfig};
pub use session::{ErrorPolicy, SessionConfig};
