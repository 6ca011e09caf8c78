//! Path utilities for lmhost data directories.
//!
//! This module provides the canonical path resolution for all lmhost components:
//! - Extension-local resources (bundled binaries and models)
//! - The managed `bin` directory and the home staging fallback
//! - The models root handed to the server
//! - Temporary download staging
//!
//! # Design
//!
//! - Returns `PathBuf` and `PathError` for clear error handling
//! - No interactive/terminal I/O - adapters handle user prompts separately
//! - Environment lookups live in `platform`; `RuntimePaths` is plain data

mod ensure;
mod error;
mod layout;
mod platform;

pub use ensure::ensure_directory;
pub use error::PathError;
pub use layout::RuntimePaths;
pub use platform::{data_root, resource_root, staging_root};
