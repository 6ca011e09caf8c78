//! Error taxonomy for provisioning, supervision, installation and generation.
//!
//! These errors are `Clone` so a single start outcome can be handed to every
//! caller waiting on it. Foreign errors (`std::io::Error`, `reqwest::Error`)
//! are captured as strings at the adapter boundary.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from resolving or installing the server executable.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProvisionError {
    /// No known binary exists for this OS/architecture pair.
    #[error("no server binary is available for {os}/{arch}")]
    PlatformUnsupported { os: String, arch: String },

    /// Neither the extension-local nor the home staging location is writable.
    #[error("no writable location for the server binary ({path}): {reason}")]
    PermissionDenied { path: PathBuf, reason: String },

    /// Network transfer failed or returned a non-success status.
    #[error("binary download failed: {message}")]
    DownloadFailed { message: String },

    /// The caller cancelled the binary download.
    #[error("binary download cancelled")]
    DownloadCancelled,

    /// A filesystem step (copy, chmod, extraction) failed.
    #[error("I/O error at {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// Every install path and every system location failed.
    #[error("server executable not found (searched {} locations)", .searched.len())]
    ExecutableNotFound {
        searched: Vec<PathBuf>,
        #[source]
        cause: Option<Box<ProvisionError>>,
    },
}

impl ProvisionError {
    pub fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::DownloadCancelled)
    }
}

/// Errors from starting the managed server.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ServerError {
    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error("failed to spawn {path}: {message}")]
    Spawn { path: PathBuf, message: String },

    /// The health-poll loop exhausted its attempt ceiling.
    #[error("server did not become ready after {attempts} attempts{}", last_error_suffix(.last_error.as_deref()))]
    StartTimeout {
        attempts: u32,
        last_error: Option<String>,
    },

    /// The spawned process exited before the server became ready.
    #[error("server exited during startup (code {code:?}){}", last_error_suffix(.last_error.as_deref()))]
    ExitedDuringStartup {
        code: Option<i32>,
        last_error: Option<String>,
    },
}

fn last_error_suffix(last_error: Option<&str>) -> String {
    last_error.map(|e| format!(": {e}")).unwrap_or_default()
}

/// Errors from installing a model.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InstallError {
    #[error("unknown model: {name}")]
    UnknownModel { name: String },

    /// Copying a bundled model failed; a partial destination may remain.
    #[error("failed to extract model into {path}: {message}")]
    ExtractionFailed { path: PathBuf, message: String },

    #[error("model download failed: {message}")]
    DownloadFailed {
        message: String,
        status_code: Option<u16>,
    },

    #[error("model download cancelled")]
    DownloadCancelled,

    /// The pull stream ended cleanly but never got past the completion threshold.
    #[error("model download ended early at {}", percent_label(*.percent))]
    DownloadIncomplete { percent: Option<u8> },

    #[error(transparent)]
    Server(#[from] ServerError),
}

impl InstallError {
    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
            status_code: None,
        }
    }

    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::DownloadCancelled)
    }
}

fn percent_label(percent: Option<u8>) -> String {
    percent.map_or_else(|| "unknown progress".to_string(), |p| format!("{p}%"))
}

/// Errors from a generate request.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GenerateError {
    #[error(transparent)]
    Server(#[from] ServerError),

    /// Transport failure or a non-success HTTP status.
    #[error("generate request failed: {message}")]
    Request {
        message: String,
        status_code: Option<u16>,
    },

    /// The server answered but the body is missing the text field.
    #[error("invalid API response: {message}")]
    InvalidApiResponse { message: String },
}

impl GenerateError {
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
            status_code: None,
        }
    }
}

/// Errors from building a model registry.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("duplicate model name in catalog: {0}")]
    DuplicateName(String),

    #[error("models {first} and {second} share the directory {dir}")]
    DirectoryCollision {
        first: String,
        second: String,
        dir: String,
    },
}
