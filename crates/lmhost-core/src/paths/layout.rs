//! Resolved on-disk layout for one lmhost instance.

use std::fmt;
use std::path::{Path, PathBuf};

use super::error::PathError;
use super::platform::{data_root, resource_root, staging_root};

/// All directories an lmhost instance reads or writes.
///
/// Construct once (from the environment with [`RuntimePaths::resolve`], or
/// under a single directory with [`RuntimePaths::rooted`]) and pass to the
/// components that need it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    /// Read-only bundled resources (`bin/<os>-<arch>/`, `models/<dir>/`).
    pub resource_root: PathBuf,
    /// Extension-local writable root.
    pub data_root: PathBuf,
    /// User-home fallback when `data_root` is not writable.
    pub staging_root: PathBuf,
    /// Model storage root handed to the server.
    pub models_dir: PathBuf,
}

impl RuntimePaths {
    /// Resolve all paths using the current environment.
    pub fn resolve() -> Result<Self, PathError> {
        let data_root = data_root()?;
        Ok(Self {
            resource_root: resource_root()?,
            models_dir: data_root.join("models"),
            staging_root: staging_root()?,
            data_root,
        })
    }

    /// Every directory under `base` (tests, portable installs).
    pub fn rooted(base: &Path) -> Self {
        Self {
            resource_root: base.join("resources"),
            data_root: base.join("data"),
            staging_root: base.join("staging"),
            models_dir: base.join("data").join("models"),
        }
    }

    /// Override the models directory.
    #[must_use]
    pub fn with_models_dir(mut self, models_dir: PathBuf) -> Self {
        self.models_dir = models_dir;
        self
    }

    /// Primary managed `bin` directory.
    pub fn bin_dir(&self) -> PathBuf {
        self.data_root.join("bin")
    }

    /// Fallback `bin` directory under the home staging root.
    pub fn staging_bin_dir(&self) -> PathBuf {
        self.staging_root.join("bin")
    }

    /// Temporary area for in-flight downloads, removed on dispose.
    pub fn download_dir(&self) -> PathBuf {
        self.data_root.join("tmp")
    }

    /// Bundled server binaries, one subdirectory per `<os>-<arch>`.
    pub fn bundled_bin_dir(&self) -> PathBuf {
        self.resource_root.join("bin")
    }

    /// Bundled model payloads, one subdirectory per model `dir_name`.
    pub fn bundled_models_dir(&self) -> PathBuf {
        self.resource_root.join("models")
    }
}

impl fmt::Display for RuntimePaths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "resources: {}", self.resource_root.display())?;
        writeln!(f, "data:      {}", self.data_root.display())?;
        writeln!(f, "bin:       {}", self.bin_dir().display())?;
        writeln!(f, "staging:   {}", self.staging_bin_dir().display())?;
        write!(f, "models:    {}", self.models_dir.display())
    }
}
