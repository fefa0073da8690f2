//! Test configuration and artifact path resolution.
//!
//! Paths are derived from the configuration on every access, so changing the
//! configuration between runs retargets the next run at a new artifact set.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Base name used when neither a kind-specific nor a global one is set.
pub const DEFAULT_BASE_NAME: &str = "test";

/// Directory used when no base directory is set.
pub const DEFAULT_BASE_DIR: &str = "testdata";

/// The kinds of artifact a test touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Fixture script loaded before the action runs.
    Setup,
    /// Output written by the action, overwritten each run.
    Output,
    /// Hand-maintained reference the output must match.
    Golden,
}

impl ArtifactKind {
    /// File extension appended to derived paths.
    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Setup => "setup",
            ArtifactKind::Output => "out",
            ArtifactKind::Golden => "golden",
        }
    }
}

/// Per-artifact overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArtifactConfig {
    /// Base name for this artifact only; wins over the global base name.
    pub base_name: Option<String>,
    /// Full path for this artifact; wins over everything else.
    pub path: Option<PathBuf>,
}

/// Configuration for one test, or a group of tests run in sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TestConfig {
    /// Base name for all artifacts; defaults to `"test"`.
    pub base_name: Option<String>,
    /// Directory holding the artifacts; defaults to `"testdata"`.
    pub base_dir: Option<PathBuf>,
    pub setup: ArtifactConfig,
    pub out: ArtifactConfig,
    pub golden: ArtifactConfig,
}

impl TestConfig {
    /// Create a configuration with the given global base name.
    pub fn new(base_name: impl Into<String>) -> Self {
        Self {
            base_name: Some(base_name.into()),
            ..Self::default()
        }
    }

    /// Builder-style override of the base directory.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    fn artifact(&self, kind: ArtifactKind) -> &ArtifactConfig {
        match kind {
            ArtifactKind::Setup => &self.setup,
            ArtifactKind::Output => &self.out,
            ArtifactKind::Golden => &self.golden,
        }
    }

    /// Complete path to the artifact of the given kind.
    pub fn path_for(&self, kind: ArtifactKind) -> PathBuf {
        let artifact = self.artifact(kind);
        resolve(
            artifact.path.as_deref(),
            artifact.base_name.as_deref(),
            self.base_name.as_deref(),
            self.base_dir.as_deref(),
            kind.extension(),
        )
    }

    pub fn setup_path(&self) -> PathBuf {
        self.path_for(ArtifactKind::Setup)
    }

    pub fn out_path(&self) -> PathBuf {
        self.path_for(ArtifactKind::Output)
    }

    pub fn golden_path(&self) -> PathBuf {
        self.path_for(ArtifactKind::Golden)
    }
}

/// Compute an artifact path from layered configuration.
///
/// An explicit path is returned verbatim. Otherwise the file name is the
/// first non-empty of `base_name`, `global_base_name` and `"test"`, plus
/// `.extension`, joined onto `base_dir` (or `"testdata"`). Empty values
/// count as unset.
pub fn resolve(
    explicit_path: Option<&Path>,
    base_name: Option<&str>,
    global_base_name: Option<&str>,
    base_dir: Option<&Path>,
    extension: &str,
) -> PathBuf {
    if let Some(path) = explicit_path.filter(|p| !p.as_os_str().is_empty()) {
        return path.to_path_buf();
    }
    let name = base_name
        .filter(|s| !s.is_empty())
        .or(global_base_name.filter(|s| !s.is_empty()))
        .unwrap_or(DEFAULT_BASE_NAME);
    let dir = base_dir
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new(DEFAULT_BASE_DIR));
    dir.join(format!("{name}.{extension}"))
}
