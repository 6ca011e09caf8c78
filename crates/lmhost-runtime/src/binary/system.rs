//! Lookup of a pre-existing system installation.

use std::path::PathBuf;

use super::platform::Platform;

/// Common install locations, `PATH` match first.
pub fn default_system_candidates(platform: &Platform) -> Vec<PathBuf> {
    let exe = platform.executable_name();
    let mut candidates = Vec::new();

    if let Ok(found) = which::which(exe) {
        candidates.push(found);
    }

    if platform.is_windows() {
        if let Some(local) = std::env::var_os("LOCALAPPDATA") {
            candidates.push(PathBuf::from(local).join("Programs").join("Ollama").join(exe));
        }
    } else {
        for dir in ["/usr/local/bin", "/usr/bin", "/opt/homebrew/bin"] {
            candidates.push(PathBuf::from(dir).join(exe));
        }
    }

    candidates
}

/// First candidate that is an existing file.
pub fn find_existing(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|p| p.is_file()).cloned()
}
