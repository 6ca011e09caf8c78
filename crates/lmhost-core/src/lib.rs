//! Core domain types and port definitions for lmhost.
//!
//! This crate holds everything that does not touch a process, a socket, or
//! the network: the model catalog, the server state machine, the error
//! taxonomy, path resolution, settings, and the ports that adapters in
//! `lmhost-runtime` implement or consume.

pub mod domain;
pub mod error;
pub mod paths;
pub mod ports;
pub mod registry;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{
    DownloadProgress, InstallOutcome, ModelCapabilities, ModelDescriptor, ServerStatus,
    ServerTransition, TransitionError,
};
pub use error::{GenerateError, InstallError, ProvisionError, RegistryError, ServerError};
pub use ports::{ExecutableSource, NoopLogSink, NoopProgress, ProgressReporter, ServerLogSinkPort};
pub use registry::ModelRegistry;
pub use settings::{DEFAULT_SERVER_PORT, Settings, SettingsError, validate_settings};

// Re-export path utilities
pub use paths::{PathError, RuntimePaths, ensure_directory};
