//! Executable source port.
//!
//! The process supervisor only needs "a path to a server executable"; where
//! it comes from (bundled copy, download, system install, test script) is the
//! implementor's concern.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::ProvisionError;

/// Anything that can produce the path of a runnable server executable.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExecutableSource: Send + Sync {
    /// Resolve (installing if needed) the server executable.
    async fn resolve(&self) -> Result<PathBuf, ProvisionError>;
}
