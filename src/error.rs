use crate::config::ConfigError;
use crate::process::ProcessError;
use crate::snapshot::SnapshotError;
use std::fmt;
use std::path::PathBuf;

/// An unmet expectation. The full context (diff, captured output) has
/// already been flushed through the diagnostics sink by the time this is
/// returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionFailure {
    pub message: String,
}

impl AssertionFailure {
    pub fn new(message: impl Into<String>) -> Self {
        AssertionFailure {
            message: message.into(),
        }
    }
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for AssertionFailure {}

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error("{path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Spawn(#[from] ProcessError),
    #[error("Assertion failed: {0}")]
    Assertion(#[from] AssertionFailure),
    #[error("Environment error: {0}")]
    Environment(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl HarnessError {
    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HarnessError::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub fn is_assertion(&self) -> bool {
        matches!(self, HarnessError::Assertion(_))
    }
}

pub type Result<T, E = HarnessError> = std::result::Result<T, E>;
