//! Configuration file loading and merging

use super::schema::Config;
use crate::error::{IpsetError, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use toml::Table;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Find user config by checking environment and standard locations
    pub fn find_user_config() -> Option<PathBuf> {
        // 1. $EZSET_CONFIG
        if let Ok(path) = env::var("EZSET_CONFIG") {
            let p = PathBuf::from(path);
            if p.exists() {
                return Some(p);
            }
        }

        // 2. $XDG_CONFIG_HOME/ezset/config.toml
        if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
            let p = PathBuf::from(xdg).join("ezset/config.toml");
            if p.exists() {
                return Some(p);
            }
        }

        // 3. ~/.config/ezset/config.toml
        if let Ok(home) = env::var("HOME") {
            let p = PathBuf::from(home).join(".config/ezset/config.toml");
            if p.exists() {
                return Some(p);
            }
        }

        None
    }

    fn read_table(path: &Path) -> Result<Table> {
        let contents = fs::read_to_string(path).map_err(|source| IpsetError::ConfigLoad {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Load config from a file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
        let table = Self::read_table(path.as_ref())?;
        Ok(toml::Value::Table(table).try_into()?)
    }

    /// Merge `over` into `base`; keys present in `over` win, nested tables merge
    pub fn merge_tables(base: &mut Table, over: Table) {
        for (key, value) in over {
            match value {
                toml::Value::Table(over_inner) => {
                    if let Some(toml::Value::Table(base_inner)) = base.get_mut(&key) {
                        Self::merge_tables(base_inner, over_inner);
                    } else {
                        base.insert(key, toml::Value::Table(over_inner));
                    }
                }
                other => {
                    base.insert(key, other);
                }
            }
        }
    }

    /// Load with full config priority order
    /// Priority: defaults < user < explicit
    pub fn load_with_priority(explicit_config: Option<PathBuf>) -> Result<Config> {
        let mut merged = Table::new();

        if let Some(user_path) = Self::find_user_config() {
            tracing::debug!("Loading user config from {:?}", user_path);
            Self::merge_tables(&mut merged, Self::read_table(&user_path)?);
        }

        if let Some(explicit_path) = explicit_config {
            tracing::debug!("Loading explicit config from {:?}", explicit_path);
            Self::merge_tables(&mut merged, Self::read_table(&explicit_path)?);
        }

        if merged.is_empty() {
            tracing::debug!("No config file found, using defaults");
        }

        Ok(toml::Value::Table(merged).try_into()?)
    }

    /// Load config from optional path with user config and defaults underneath
    pub fn load_or_default(path: Option<PathBuf>) -> Result<Config> {
        Self::load_with_priority(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.common.config_version, "1.0");
        assert!(!config.common.verbose);
        assert_eq!(config.ipset.command, "ipset");
        assert!(config.ipset.raise_on_errors);
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
[common]
config_version = "1.0"
verbose = true

[ipset]
command = "/usr/sbin/ipset"
timeout_secs = 10
"#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(config.common.verbose);
        assert_eq!(config.ipset.command, "/usr/sbin/ipset");
        assert_eq!(config.ipset.timeout_secs, 10);
        assert_eq!(config.ipset.elapsed_decimal_places, 9);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: std::result::Result<Config, _> = toml::from_str("[ipset]\nbogus = 1\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_keeps_unset_keys() {
        let mut base: Table = toml::from_str("[ipset]\ncommand = \"ipset\"\ntimeout_secs = 3\n").unwrap();
        let over: Table = toml::from_str("[ipset]\ntimeout_secs = 30\n").unwrap();

        ConfigLoader::merge_tables(&mut base, over);
        let config: Config = toml::Value::Table(base).try_into().unwrap();

        assert_eq!(config.ipset.command, "ipset");
        assert_eq!(config.ipset.timeout_secs, 30);
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[ipset]\nraise_on_errors = false\n").unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert!(!config.ipset.raise_on_errors);

        let missing = ConfigLoader::load_from_file(dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(IpsetError::ConfigLoad { .. })));
    }
}
