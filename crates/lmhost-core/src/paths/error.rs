//! Path-related error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during path resolution and directory operations.
#[derive(Debug, Error)]
pub enum PathError {
    /// Could not determine the user's home directory.
    #[error("Cannot determine home directory")]
    NoHomeDir,

    /// Could not determine the system data directory.
    #[error("Cannot determine system data directory")]
    NoDataDir,

    /// A path was expected to be a directory but was not.
    #[error("{0} exists but is not a directory")]
    NotADirectory(PathBuf),

    /// Failed to create a directory.
    #[error("Failed to create directory {path}: {reason}")]
    CreateFailed { path: PathBuf, reason: String },

    /// A directory is not writable.
    #[error("Directory {path} is not writable: {reason}")]
    NotWritable { path: PathBuf, reason: String },
}

impl PathError {
    /// The path this error is about, when there is one.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::NotADirectory(path) => Some(path),
            Self::CreateFailed { path, .. } | Self::NotWritable { path, .. } => Some(path),
            Self::NoHomeDir | Self::NoDataDir => None,
        }
    }
}
