//! Configuration loader.
//!
//! Loads a [`TestConfig`] from a YAML or TOML file, for suites that keep
//! artifact locations out of the test code.

use crate::config::TestConfig;
use std::path::Path;

/// Error type for configuration loading.
#[derive(Debug)]
pub enum LoadError {
    /// Failed to read the file.
    Io(std::io::Error),
    /// Failed to parse YAML.
    Yaml(serde_yaml::Error),
    /// Failed to parse TOML.
    Toml(toml::de::Error),
    /// Unsupported file extension.
    UnsupportedFormat(String),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Io(e) => write!(f, "failed to read file: {e}"),
            LoadError::Yaml(e) => write!(f, "invalid YAML: {e}"),
            LoadError::Toml(e) => write!(f, "invalid TOML: {e}"),
            LoadError::UnsupportedFormat(ext) => {
                write!(
                    f,
                    "unsupported file format: {ext} (expected .yaml, .yml, or .toml)"
                )
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io(e) => Some(e),
            LoadError::Yaml(e) => Some(e),
            LoadError::Toml(e) => Some(e),
            LoadError::UnsupportedFormat(_) => None,
        }
    }
}

/// Load a test configuration from a file path.
///
/// Missing fields take their defaults; unknown fields are rejected.
pub fn load_config(path: &Path) -> Result<TestConfig, LoadError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if !matches!(ext, "yaml" | "yml" | "toml") {
        return Err(LoadError::UnsupportedFormat(ext.to_string()));
    }
    let contents = std::fs::read_to_string(path).map_err(LoadError::Io)?;
    parse_config(&contents, ext)
}

fn parse_config(contents: &str, ext: &str) -> Result<TestConfig, LoadError> {
    match ext {
        // An empty YAML document means "all defaults".
        "yaml" | "yml" if contents.trim().is_empty() => Ok(TestConfig::default()),
        "yaml" | "yml" => serde_yaml::from_str(contents).map_err(LoadError::Yaml),
        "toml" => toml::from_str(contents).map_err(LoadError::Toml),
        other => Err(LoadError::UnsupportedFormat(other.to_string())),
    }
}
