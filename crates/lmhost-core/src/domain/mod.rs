//! Domain types shared by every lmhost component.

mod install;
mod model;
mod progress;
mod server;

pub use install::InstallOutcome;
pub use model::{ModelCapabilities, ModelDescriptor};
pub use progress::DownloadProgress;
pub use server::{ServerStatus, ServerTransition, TransitionError};
