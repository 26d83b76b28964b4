//! Configuration of the semantic core.
//!
//! Loaded from the top level of a TOML file such as:
//!
//! ```toml
//! max_simplify_rounds = 128
//! max_specialization_depth = 16
//! fold_calls = true
//! ```
//!
//! Every field has a default, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "vapc.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SemaConfig {
    /// Module whose `entry_function` is the program entry point.
    #[serde(default = "default_entry_module")]
    pub entry_module: String,

    #[serde(default = "default_entry_function")]
    pub entry_function: String,

    /// Upper bound on simplification rounds before giving up.
    #[serde(default = "default_max_simplify_rounds")]
    pub max_simplify_rounds: usize,

    /// Nested compile-time calls deeper than this stay unfolded.
    #[serde(default = "default_max_specialization_depth")]
    pub max_specialization_depth: usize,

    /// Evaluate calls with constant arguments at compile time.
    #[serde(default = "default_true")]
    pub fold_calls: bool,

    /// Memoize folded calls by function and constant arguments.
    #[serde(default = "default_true")]
    pub cache_specializations: bool,
}

fn default_entry_module() -> String {
    "main".to_string()
}

fn default_entry_function() -> String {
    "entry".to_string()
}

fn default_max_simplify_rounds() -> usize {
    64
}

fn default_max_specialization_depth() -> usize {
    32
}

fn default_true() -> bool {
    true
}

impl Default for SemaConfig {
    fn default() -> Self {
        Self {
            entry_module: default_entry_module(),
            entry_function: default_entry_function(),
            max_simplify_rounds: default_max_simplify_rounds(),
            max_specialization_depth: default_max_specialization_depth(),
            fold_calls: true,
            cache_specializations: true,
        }
    }
}

impl SemaConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: SemaConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_simplify_rounds == 0 {
            return Err(ConfigError::Invalid {
                field: "max_simplify_rounds",
                reason: "must be at least 1".into(),
            });
        }
        if self.max_specialization_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "max_specialization_depth",
                reason: "must be at least 1".into(),
            });
        }
        if self.entry_module.is_empty() || self.entry_function.is_empty() {
            return Err(ConfigError::Invalid {
                field: "entry_module",
                reason: "entry point names must not be empty".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = SemaConfig::from_toml_str("").unwrap();
        assert_eq!(config, SemaConfig::default());
        assert_eq!(config.entry_module, "main");
        assert_eq!(config.max_simplify_rounds, 64);
    }

    #[test]
    fn test_partial_override() {
        let config = SemaConfig::from_toml_str("max_simplify_rounds = 5\nfold_calls = false").unwrap();
        assert_eq!(config.max_simplify_rounds, 5);
        assert!(!config.fold_calls);
        assert!(config.cache_specializations);
    }

    #[test]
    fn test_zero_rounds_rejected() {
        let err = SemaConfig::from_toml_str("max_simplify_rounds = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "max_simplify_rounds", .. }));
    }

    #[test]
    fn test_malformed_toml() {
        let err = SemaConfig::from_toml_str("max_simplify_rounds = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "entry_function = \"start\"").unwrap();
        let config = SemaConfig::load(file.path()).unwrap();
        assert_eq!(config.entry_function, "start");
        assert!(matches!(
            SemaConfig::load(Path::new("/nonexistent/vapc.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
