//! Error types shared by every layer of the harness.
//!
//! Every phase returns its failure to the driver immediately; nothing here
//! is retried or recovered.

use crate::lifecycle::{LifecycleState, Phase};
use crate::loader::LoadError;
use std::path::PathBuf;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Which artifact a read failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Output,
    Golden,
}

impl std::fmt::Display for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Artifact::Output => write!(f, "output file"),
            Artifact::Golden => write!(f, "golden file"),
        }
    }
}

/// Error raised by a fixture store.
#[derive(Debug)]
pub struct StoreError {
    pub message: String,
    /// Store URL the error came from, when known.
    pub url: Option<String>,
}

impl StoreError {
    #[cfg(test)]
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            url: None,
        }
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.url {
            Some(url) => write!(f, "{} (store: {url})", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for StoreError {}

/// A fixture script statement failed; later statements were not executed.
#[derive(Debug)]
pub struct StatementError {
    /// Zero-based position among the statements actually executed.
    pub index: usize,
    /// The statement text after comment stripping.
    pub statement: String,
    pub cause: StoreError,
}

impl std::fmt::Display for StatementError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "setup statement #{} failed: {}\n  statement: {}",
            self.index + 1,
            self.cause,
            self.statement
        )
    }
}

impl std::error::Error for StatementError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// Any failure surfaced by a lifecycle phase.
#[derive(Debug)]
pub enum Error {
    /// Configuration could not be loaded.
    Config(LoadError),
    /// Creating or using the output sink or the fixture store failed.
    Resource {
        context: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// A fixture script statement failed.
    Statement(StatementError),
    /// Act was invoked without a callback.
    NoActionConfigured,
    /// A phase was invoked in a state that does not permit it.
    PhaseOrder { phase: Phase, state: LifecycleState },
    /// The user callback failed.
    Action(anyhow::Error),
    /// Output differs from the golden file.
    Mismatch {
        output: PathBuf,
        golden: PathBuf,
        /// First line (1-based) where the two files differ.
        first_line: usize,
    },
    /// Either artifact could not be read, including when it does not exist.
    ReadFailure {
        which: Artifact,
        path: PathBuf,
        source: std::io::Error,
    },
    /// A handler answered with something other than 200 OK.
    UnexpectedStatus {
        uri: String,
        status: u16,
        body: String,
    },
    /// A handler answered 200 OK with an empty body.
    EmptyResponse { uri: String },
}

impl Error {
    pub(crate) fn resource(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::Resource {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Config(e) => write!(f, "configuration error: {e}"),
            Error::Resource { context, source } => write!(f, "{context}: {source}"),
            Error::Statement(e) => write!(f, "{e}"),
            Error::NoActionConfigured => write!(f, "no test action configured"),
            Error::PhaseOrder { phase, state } => {
                write!(f, "cannot run {phase} while tester is {state}")
            }
            Error::Action(e) => write!(f, "test action failed: {e:#}"),
            Error::Mismatch {
                output,
                golden,
                first_line,
            } => write!(
                f,
                "output file {} does not match golden file {} (first difference at line {first_line})",
                output.display(),
                golden.display()
            ),
            Error::ReadFailure {
                which,
                path,
                source,
            } => write!(f, "error reading {which} {}: {source}", path.display()),
            Error::UnexpectedStatus { uri, status, body } => write!(
                f,
                "HTTP response status for request {uri}: got {status}, want 200\nBody: {body}"
            ),
            Error::EmptyResponse { uri } => {
                write!(f, "response body for request {uri} should not be empty")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(e) => Some(e),
            Error::Resource { source, .. } => Some(&**source),
            Error::Statement(e) => Some(e),
            Error::ReadFailure { source, .. } => Some(source),
            Error::Action(e) => Some(&**e),
            _ => None,
        }
    }
}

impl From<LoadError> for Error {
    fn from(e: LoadError) -> Self {
        Error::Config(e)
    }
}

impl From<StatementError> for Error {
    fn from(e: StatementError) -> Self {
        Error::Statement(e)
    }
}
