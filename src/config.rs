//! Configuration file parsing
//!
//! Reads `rembrandb.toml`. Every key has a default, so a missing file means
//! a default configuration; CLI flags override whatever the file says.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub tables: TablesConfig,

    #[serde(default)]
    pub query: QueryConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TablesConfig {
    /// Directory holding `.tbl` manifests and per-table column directories
    #[serde(default = "default_dir")]
    pub dir: PathBuf,

    /// Tables that must load at startup
    #[serde(default = "default_names")]
    pub names: Vec<String>,

    /// Tables loaded only when their manifest is present
    #[serde(default = "default_optional_names")]
    pub optional_names: Vec<String>,
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            names: default_names(),
            optional_names: default_optional_names(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryConfig {
    /// Run the optimizing pipeline on generated kernels
    #[serde(default)]
    pub optimize: bool,

    /// Print result tables after execution
    #[serde(default = "default_true")]
    pub print_results: bool,

    /// Print each kernel's IR during compilation
    #[serde(default = "default_true")]
    pub dump_ir: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            optimize: false,
            print_results: true,
            dump_ir: true,
        }
    }
}

fn default_dir() -> PathBuf {
    PathBuf::from("Tables")
}

fn default_names() -> Vec<String> {
    vec!["demo".to_string()]
}

fn default_optional_names() -> Vec<String> {
    vec!["benchmark".to_string()]
}

fn default_true() -> bool {
    true
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_serve_demo_from_tables_dir() {
        let config = Config::default();
        assert_eq!(config.tables.dir, PathBuf::from("Tables"));
        assert_eq!(config.tables.names, ["demo"]);
        assert_eq!(config.tables.optional_names, ["benchmark"]);
        assert!(!config.query.optimize);
        assert!(config.query.print_results);
        assert!(config.query.dump_ir);
    }

    #[test]
    fn partial_file_keeps_unmentioned_defaults() {
        let config: Config = toml::from_str(
            r#"
            [query]
            optimize = true
            dump_ir = false
            "#,
        )
        .unwrap();
        assert!(config.query.optimize);
        assert!(!config.query.dump_ir);
        assert!(config.query.print_results);
        assert_eq!(config.tables.names, ["demo"]);
    }

    #[test]
    fn table_lists_are_overridable() {
        let config: Config = toml::from_str(
            r#"
            [tables]
            dir = "data"
            names = ["demo", "sales"]
            optional_names = []
            "#,
        )
        .unwrap();
        assert_eq!(config.tables.dir, PathBuf::from("data"));
        assert_eq!(config.tables.names, ["demo", "sales"]);
        assert!(config.tables.optional_names.is_empty());
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rembrandb.toml");
        std::fs::write(&path, "[query\noptimize = yes").unwrap();
        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
