//! Environment-driven root directory resolution.

use std::env;
use std::path::PathBuf;

use super::error::PathError;

/// Get the root directory for application data (models, managed binaries).
///
/// Resolution order:
/// 1. `LMHOST_DATA_DIR` environment variable (highest priority)
/// 2. System data directory (e.g., `~/.local/share/lmhost`)
pub fn data_root() -> Result<PathBuf, PathError> {
    if let Ok(path) = env::var("LMHOST_DATA_DIR") {
        return Ok(PathBuf::from(path));
    }

    let data_dir = dirs::data_local_dir().ok_or(PathError::NoDataDir)?;
    Ok(data_dir.join("lmhost"))
}

/// Get the root directory for bundled resources (binaries, model payloads).
///
/// Resolution order:
/// 1. `LMHOST_RESOURCE_DIR` environment variable
/// 2. `resources/` next to the running executable
/// 3. Falls back to data root
pub fn resource_root() -> Result<PathBuf, PathError> {
    if let Ok(path) = env::var("LMHOST_RESOURCE_DIR") {
        return Ok(PathBuf::from(path));
    }

    if let Some(dir) = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.join("resources")))
    {
        if dir.is_dir() {
            return Ok(dir);
        }
    }

    data_root()
}

/// Get the user-home staging directory used when the data root is not writable.
pub fn staging_root() -> Result<PathBuf, PathError> {
    let home = dirs::home_dir().ok_or(PathError::NoHomeDir)?;
    Ok(home.join(".lmhost"))
}
